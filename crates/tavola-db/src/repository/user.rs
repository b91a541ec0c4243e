//! # User Repository
//!
//! Accounts: lookup by id or email, partial updates, login stamps and
//! password changes.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::listing::{fetch_page, search_text, store_search_text, ListSpec};
use tavola_core::{ListParams, NewUser, SortSpec, User, UserChanges};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone_number, \
     birth_date, is_admin, is_employee, registered_at, last_login_date";

/// Search key over email, first name, last name and phone number.
fn user_search_text(email: &str, first_name: &str, last_name: &str, phone: Option<&str>) -> String {
    search_text([email, first_name, last_name, phone.unwrap_or_default()])
}

/// Repository for user database operations.
pub struct UserRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> UserRepository<'c> {
    /// Fields accepted by the `sort` list parameter.
    pub const SORTABLE: &'static [&'static str] =
        &["first_name", "last_name", "registered_at", "last_login_date"];

    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        UserRepository { conn }
    }

    /// Inserts a user. The caller hashes the password.
    pub async fn create(
        &mut self,
        user: &NewUser,
        password_hash: &str,
        is_admin: bool,
        is_employee: bool,
    ) -> DbResult<User> {
        let now = Utc::now();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (
                email, password_hash, first_name, last_name, phone_number,
                birth_date, is_admin, is_employee, registered_at, last_login_date,
                search_text
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&user.email)
        .bind(password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .bind(user.birth_date)
        .bind(is_admin)
        .bind(is_employee)
        .bind(now)
        .bind(now)
        .bind(user_search_text(
            &user.email,
            &user.first_name,
            &user.last_name,
            user.phone_number.as_deref(),
        ))
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, user.email.clone()),
            other => other,
        })?;

        debug!(user_id = id, "User inserted");
        self.get_by_id(id).await
    }

    pub async fn find_by_id(&mut self, id: i64) -> DbResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(user)
    }

    /// Like [`find_by_id`](Self::find_by_id) but a missing row is an error.
    pub async fn get_by_id(&mut self, id: i64) -> DbResult<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    pub async fn find_by_email(&mut self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(user)
    }

    /// Applies the fields present in `changes`.
    pub async fn update(&mut self, id: i64, changes: &UserChanges) -> DbResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                first_name   = COALESCE(?, first_name),
                last_name    = COALESCE(?, last_name),
                email        = COALESCE(?, email),
                phone_number = COALESCE(?, phone_number),
                birth_date   = COALESCE(?, birth_date)
            WHERE id = ?
            "#,
        )
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.email)
        .bind(&changes.phone_number)
        .bind(changes.birth_date)
        .bind(id)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, changes.email.clone().unwrap_or_default())
            }
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        let user = self.get_by_id(id).await?;
        let text = user_search_text(
            &user.email,
            &user.first_name,
            &user.last_name,
            user.phone_number.as_deref(),
        );
        store_search_text(self.conn, "users", id, &text).await?;
        Ok(user)
    }

    pub async fn set_password_hash(&mut self, id: i64, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }

    /// Records activity of an authenticated request.
    pub async fn touch_last_login(&mut self, id: i64, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login_date = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    /// Deletes the user with their addresses, orders and employee profile.
    /// Returns `false` when no such user existed.
    pub async fn delete(&mut self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(
        &mut self,
        params: &ListParams,
        sort: Option<SortSpec>,
    ) -> DbResult<(Vec<User>, i64)> {
        let spec = ListSpec {
            select: "SELECT id, email, password_hash, first_name, last_name, phone_number, \
                     birth_date, is_admin, is_employee, registered_at, last_login_date FROM users",
            count: "SELECT COUNT(*) FROM users",
            id_column: "id",
            search_column: Some("search_text"),
            filters: Vec::new(),
        };
        fetch_page(self.conn, &spec, params, sort).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn new_user(email: &str, first_name: &str) -> NewUser {
        NewUser {
            first_name: first_name.to_string(),
            last_name: "Rossi".to_string(),
            email: email.to_string(),
            password: "unused-here".to_string(),
            phone_number: None,
            birth_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();

        let user = session
            .users()
            .create(&new_user("mario@example.com", "Mario"), "hash", false, false)
            .await
            .unwrap();

        assert_eq!(user.first_name, "Mario");
        assert!(!user.is_admin);

        let found = session
            .users()
            .find_by_email("mario@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.password_hash, "hash");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();

        let user = new_user("luigi@example.com", "Luigi");
        session.users().create(&user, "h", false, false).await.unwrap();
        let err = session.users().create(&user, "h", false, false).await.unwrap_err();

        match err {
            DbError::UniqueViolation { value, .. } => assert_eq!(value, "luigi@example.com"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();

        let user = session
            .users()
            .create(&new_user("anna@example.com", "Anna"), "h", false, false)
            .await
            .unwrap();

        let updated = session
            .users()
            .update(
                user.id,
                &UserChanges {
                    last_name: Some("Bianchi".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.first_name, "Anna");
        assert_eq!(updated.last_name, "Bianchi");
        assert_eq!(updated.email, "anna@example.com");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();

        let user = session
            .users()
            .create(&new_user("gone@example.com", "Gone"), "h", false, false)
            .await
            .unwrap();

        assert!(session.users().delete(user.id).await.unwrap());
        assert!(!session.users().delete(user.id).await.unwrap());
        assert!(!session.users().delete(9999).await.unwrap());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_across_fields() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();

        for (email, name) in [
            ("carla@example.com", "Carla"),
            ("dino@example.com", "Dino"),
            ("e.carlsson@example.com", "Erik"),
        ] {
            session.users().create(&new_user(email, name), "h", false, false).await.unwrap();
        }

        let params = ListParams {
            search: Some("CARL".to_string()),
            sort: Some("-first_name".to_string()),
            ..Default::default()
        };
        let sort = params.resolve(UserRepository::SORTABLE).unwrap();
        let (users, total) = session.users().list(&params, sort).await.unwrap();

        assert_eq!(total, 2);
        let names: Vec<&str> = users.iter().map(|u| u.first_name.as_str()).collect();
        assert_eq!(names, vec!["Erik", "Carla"]);
    }
}
