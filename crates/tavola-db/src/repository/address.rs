//! # Address Repository
//!
//! A user's address book. Placing an order reuses a stored address when
//! all four fields match exactly, so the book never holds duplicates
//! created by ordering.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::listing::{fetch_page, search_text, store_search_text, ListSpec};
use tavola_core::{Address, AddressChanges, ListParams, NewAddress, SortSpec};

/// Search key over city, street and postal code.
fn address_search_text(city: &str, street: &str, postal_code: &str) -> String {
    search_text([city, street, postal_code])
}

/// Repository for address database operations.
pub struct AddressRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> AddressRepository<'c> {
    pub const SORTABLE: &'static [&'static str] = &["city", "street", "created_at"];

    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        AddressRepository { conn }
    }

    /// Finds the user's address equal to `address` in every field.
    pub async fn find_matching(
        &mut self,
        user_id: i64,
        address: &NewAddress,
    ) -> DbResult<Option<Address>> {
        let found = sqlx::query_as::<_, Address>(
            r#"
            SELECT id, user_id, city, street, street_number, postal_code, created_at
            FROM addresses
            WHERE user_id = ? AND city = ? AND street = ?
              AND street_number = ? AND postal_code = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(&address.city)
        .bind(&address.street)
        .bind(address.street_number)
        .bind(&address.postal_code)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(found)
    }

    pub async fn create(&mut self, user_id: i64, address: &NewAddress) -> DbResult<Address> {
        let created = sqlx::query_as::<_, Address>(
            r#"
            INSERT INTO addresses
                (user_id, city, street, street_number, postal_code, created_at, search_text)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, user_id, city, street, street_number, postal_code, created_at
            "#,
        )
        .bind(user_id)
        .bind(&address.city)
        .bind(&address.street)
        .bind(address.street_number)
        .bind(&address.postal_code)
        .bind(Utc::now())
        .bind(address_search_text(&address.city, &address.street, &address.postal_code))
        .fetch_one(&mut *self.conn)
        .await?;

        debug!(address_id = created.id, user_id, "Address inserted");
        Ok(created)
    }

    /// Returns the stored match or inserts a new row.
    pub async fn find_or_create(&mut self, user_id: i64, address: &NewAddress) -> DbResult<Address> {
        match self.find_matching(user_id, address).await? {
            Some(existing) => {
                debug!(address_id = existing.id, "Reusing stored address");
                Ok(existing)
            }
            None => self.create(user_id, address).await,
        }
    }

    /// Looks up an address only if it belongs to `user_id`.
    pub async fn find_for_user(&mut self, user_id: i64, id: i64) -> DbResult<Option<Address>> {
        let found = sqlx::query_as::<_, Address>(
            r#"
            SELECT id, user_id, city, street, street_number, postal_code, created_at
            FROM addresses
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(found)
    }

    /// Most recently added address, used when an order names none.
    pub async fn latest_for_user(&mut self, user_id: i64) -> DbResult<Option<Address>> {
        let found = sqlx::query_as::<_, Address>(
            r#"
            SELECT id, user_id, city, street, street_number, postal_code, created_at
            FROM addresses
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(found)
    }

    pub async fn list_for_user(
        &mut self,
        user_id: i64,
        params: &ListParams,
        sort: Option<SortSpec>,
    ) -> DbResult<(Vec<Address>, i64)> {
        let spec = ListSpec {
            select: "SELECT id, user_id, city, street, street_number, postal_code, created_at \
                     FROM addresses",
            count: "SELECT COUNT(*) FROM addresses",
            id_column: "id",
            search_column: Some("search_text"),
            filters: Vec::new(),
        }
        .filter("user_id", user_id);

        fetch_page(self.conn, &spec, params, sort).await
    }

    /// Loads several addresses in one query. Unknown ids are skipped.
    pub async fn find_by_ids(&mut self, ids: &[i64]) -> DbResult<Vec<Address>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, user_id, city, street, street_number, postal_code, created_at \
             FROM addresses WHERE id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let addresses = qb.build_query_as::<Address>().fetch_all(&mut *self.conn).await?;
        Ok(addresses)
    }

    /// Applies the fields present in `changes` to the user's address.
    pub async fn update(
        &mut self,
        user_id: i64,
        id: i64,
        changes: &AddressChanges,
    ) -> DbResult<Address> {
        let updated = sqlx::query_as::<_, Address>(
            r#"
            UPDATE addresses SET
                city          = COALESCE(?, city),
                street        = COALESCE(?, street),
                street_number = COALESCE(?, street_number),
                postal_code   = COALESCE(?, postal_code)
            WHERE id = ? AND user_id = ?
            RETURNING id, user_id, city, street, street_number, postal_code, created_at
            "#,
        )
        .bind(&changes.city)
        .bind(&changes.street)
        .bind(changes.street_number)
        .bind(&changes.postal_code)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        let updated = updated.ok_or_else(|| DbError::not_found("Address", id))?;
        let text = address_search_text(&updated.city, &updated.street, &updated.postal_code);
        store_search_text(self.conn, "addresses", id, &text).await?;
        Ok(updated)
    }

    /// Removes the user's address. Orders that referenced it keep their
    /// data with `address_id` cleared.
    pub async fn delete_for_user(&mut self, user_id: i64, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tavola_core::NewUser;

    async fn user_id(session: &mut crate::DbSession, email: &str) -> i64 {
        let user = NewUser {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: email.to_string(),
            password: String::new(),
            phone_number: None,
            birth_date: None,
        };
        session.users().create(&user, "h", false, false).await.unwrap().id
    }

    fn warsaw() -> NewAddress {
        NewAddress {
            city: "Warszawa".to_string(),
            street: "Nowy Świat".to_string(),
            street_number: 15,
            postal_code: "00-029".to_string(),
        }
    }

    #[tokio::test]
    async fn test_find_or_create_deduplicates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();
        let owner = user_id(&mut session, "a@example.com").await;

        let first = session.addresses().find_or_create(owner, &warsaw()).await.unwrap();
        let second = session.addresses().find_or_create(owner, &warsaw()).await.unwrap();
        assert_eq!(first.id, second.id);

        let mut other = warsaw();
        other.street_number = 16;
        let third = session.addresses().find_or_create(owner, &other).await.unwrap();
        assert_ne!(first.id, third.id);

        let (_, total) = session
            .addresses()
            .list_for_user(owner, &ListParams::default(), None)
            .await
            .unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_addresses_are_scoped_to_owner() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();
        let owner = user_id(&mut session, "owner@example.com").await;
        let stranger = user_id(&mut session, "stranger@example.com").await;

        let address = session.addresses().create(owner, &warsaw()).await.unwrap();

        assert!(session
            .addresses()
            .find_for_user(stranger, address.id)
            .await
            .unwrap()
            .is_none());
        assert!(!session
            .addresses()
            .delete_for_user(stranger, address.id)
            .await
            .unwrap());
        assert!(session
            .addresses()
            .delete_for_user(owner, address.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_search_matches_accented_street() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();
        let owner = user_id(&mut session, "c@example.com").await;

        let stored = session.addresses().create(owner, &warsaw()).await.unwrap();
        let params = ListParams {
            search: Some("NOWY ŚWIAT".to_string()),
            ..Default::default()
        };
        let (page, total) = session.addresses().list_for_user(owner, &params, None).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].id, stored.id);

        session
            .addresses()
            .update(
                owner,
                stored.id,
                &AddressChanges {
                    street: Some("Żurawia".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let (_, total) = session.addresses().list_for_user(owner, &params, None).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();
        let owner = user_id(&mut session, "b@example.com").await;

        let err = session
            .addresses()
            .update(owner, 404, &AddressChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
