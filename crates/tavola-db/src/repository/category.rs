//! # Category Repository

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::listing::{fetch_page, search_text, store_search_text, ListSpec};
use tavola_core::{Category, CategoryChanges, ListParams, NewCategory, SortSpec};

/// Repository for category database operations.
pub struct CategoryRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CategoryRepository<'c> {
    pub const SORTABLE: &'static [&'static str] = &["name"];

    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        CategoryRepository { conn }
    }

    pub async fn create(&mut self, category: &NewCategory) -> DbResult<Category> {
        let created = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, search_text) VALUES (?, ?) RETURNING id, name",
        )
        .bind(&category.name)
        .bind(search_text([category.name.as_str()]))
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, category.name.clone()),
            other => other,
        })?;

        debug!(category_id = created.id, name = %created.name, "Category inserted");
        Ok(created)
    }

    pub async fn find_by_id(&mut self, id: i64) -> DbResult<Option<Category>> {
        let found = sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(found)
    }

    pub async fn find_by_name(&mut self, name: &str) -> DbResult<Option<Category>> {
        let found = sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(found)
    }

    pub async fn update(&mut self, id: i64, changes: &CategoryChanges) -> DbResult<Category> {
        let updated = sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = COALESCE(?, name) WHERE id = ? RETURNING id, name",
        )
        .bind(&changes.name)
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, changes.name.clone().unwrap_or_default())
            }
            other => other,
        })?;

        let updated = updated.ok_or_else(|| DbError::not_found("Category", id))?;
        store_search_text(self.conn, "categories", id, &search_text([updated.name.as_str()])).await?;
        Ok(updated)
    }

    /// Fails with a foreign key violation while products still use it.
    pub async fn delete(&mut self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(
        &mut self,
        params: &ListParams,
        sort: Option<SortSpec>,
    ) -> DbResult<(Vec<Category>, i64)> {
        let spec = ListSpec {
            select: "SELECT id, name FROM categories",
            count: "SELECT COUNT(*) FROM categories",
            id_column: "id",
            search_column: Some("search_text"),
            filters: Vec::new(),
        };
        fetch_page(self.conn, &spec, params, sort).await
    }
}
