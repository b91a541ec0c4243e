//! # Employee Profile Repository
//!
//! One optional profile per user, removed together with the user.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tavola_core::{EmployeeProfile, NewEmployeeProfile};

pub struct EmployeeProfileRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> EmployeeProfileRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        EmployeeProfileRepository { conn }
    }

    pub async fn create(
        &mut self,
        user_id: i64,
        profile: &NewEmployeeProfile,
    ) -> DbResult<EmployeeProfile> {
        let created = sqlx::query_as::<_, EmployeeProfile>(
            r#"
            INSERT INTO employee_profiles (user_id, salary_cents, available_holidays, hire_date)
            VALUES (?, ?, ?, ?)
            RETURNING id, user_id, salary_cents, available_holidays, hire_date
            "#,
        )
        .bind(user_id)
        .bind(profile.salary_cents)
        .bind(profile.available_holidays)
        .bind(profile.hire_date)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, user_id.to_string()),
            other => other,
        })?;

        debug!(user_id, profile_id = created.id, "Employee profile inserted");
        Ok(created)
    }

    pub async fn find_by_user(&mut self, user_id: i64) -> DbResult<Option<EmployeeProfile>> {
        let found = sqlx::query_as::<_, EmployeeProfile>(
            r#"
            SELECT id, user_id, salary_cents, available_holidays, hire_date
            FROM employee_profiles
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use tavola_core::NewUser;

    #[tokio::test]
    async fn test_profile_removed_with_user() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();

        let user = NewUser {
            first_name: "Paolo".to_string(),
            last_name: "Neri".to_string(),
            email: "paolo@example.com".to_string(),
            password: String::new(),
            phone_number: None,
            birth_date: None,
        };
        let user = session.users().create(&user, "h", false, true).await.unwrap();

        let profile = NewEmployeeProfile {
            salary_cents: 350_000,
            available_holidays: 26,
            hire_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        };
        let created = session.employee_profiles().create(user.id, &profile).await.unwrap();
        assert_eq!(created.salary().to_string(), "3500.00");

        let again = session.employee_profiles().create(user.id, &profile).await;
        assert!(matches!(again, Err(DbError::UniqueViolation { .. })));

        session.users().delete(user.id).await.unwrap();
        assert!(session
            .employee_profiles()
            .find_by_user(user.id)
            .await
            .unwrap()
            .is_none());
    }
}
