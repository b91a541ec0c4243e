//! # Product Repository
//!
//! Database operations for menu items.
//!
//! ## Key Operations
//! - Batch lookup for order pricing
//! - CRUD operations
//! - Paginated search by name
//!
//! ## Batch Lookup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Order Pricing Reads Products                     │
//! │                                                                         │
//! │  order_items: [{product_id: 1}, {product_id: 4}, {product_id: 7}]      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  find_by_ids(&[1, 4, 7])                                               │
//! │       │   SELECT ... FROM products WHERE id IN (?, ?, ?)               │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │ 1 | Margherita | 1250 |                 │ ← found                   │
//! │  │ 4 | Tiramisù   |  690 |                 │ ← found                   │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tavola_core::order::price_order_lines → "Products with ids '{7}' ..." │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One query regardless of how many lines the order has.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::listing::{fetch_page, search_text, store_search_text, ListSpec};
use tavola_core::{ListParams, NewProduct, Product, ProductChanges, SortSpec};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let mut session = db.begin().await?;
///
/// // Price an order
/// let products = session.products().find_by_ids(&[1, 4]).await?;
///
/// // Get by ID
/// let product = session.products().find_by_id(1).await?;
/// ```
pub struct ProductRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProductRepository<'c> {
    /// `price` is an alias of `price_cents` in the list query.
    pub const SORTABLE: &'static [&'static str] = &["name", "price"];

    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ProductRepository { conn }
    }

    /// Inserts a product. `image_file` is the stored picture path, if any.
    pub async fn create(
        &mut self,
        product: &NewProduct,
        image_file: Option<&str>,
    ) -> DbResult<Product> {
        let created = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products
                (name, summary, price_cents, image_file, category_id, search_text)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, name, summary, price_cents, image_file, category_id
            "#,
        )
        .bind(&product.name)
        .bind(&product.summary)
        .bind(product.price_cents)
        .bind(image_file)
        .bind(product.category_id)
        .bind(search_text([product.name.as_str()]))
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, product.name.clone()),
            other => other,
        })?;

        debug!(
            product_id = created.id,
            name = %created.name,
            price = %created.price(),
            "Product inserted"
        );
        Ok(created)
    }

    pub async fn find_by_id(&mut self, id: i64) -> DbResult<Option<Product>> {
        let found = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, summary, price_cents, image_file, category_id
            FROM products
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(found)
    }

    pub async fn find_by_name(&mut self, name: &str) -> DbResult<Option<Product>> {
        let found = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, summary, price_cents, image_file, category_id
            FROM products
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(found)
    }

    /// Loads every product whose id is in `ids`. Unknown ids are simply
    /// absent from the result.
    pub async fn find_by_ids(&mut self, ids: &[i64]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, name, summary, price_cents, image_file, category_id \
             FROM products WHERE id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let products = qb.build_query_as::<Product>().fetch_all(&mut *self.conn).await?;

        debug!(requested = ids.len(), found = products.len(), "Products loaded by id");
        Ok(products)
    }

    /// Applies the fields present in `changes`. Existing orders keep the
    /// price they were placed with.
    pub async fn update(&mut self, id: i64, changes: &ProductChanges) -> DbResult<Product> {
        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name        = COALESCE(?, name),
                summary     = COALESCE(?, summary),
                price_cents = COALESCE(?, price_cents),
                category_id = COALESCE(?, category_id)
            WHERE id = ?
            RETURNING id, name, summary, price_cents, image_file, category_id
            "#,
        )
        .bind(&changes.name)
        .bind(&changes.summary)
        .bind(changes.price_cents)
        .bind(changes.category_id)
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, changes.name.clone().unwrap_or_default())
            }
            other => other,
        })?;

        let updated = updated.ok_or_else(|| DbError::not_found("Product", id))?;
        if changes.name.is_some() {
            store_search_text(self.conn, "products", id, &search_text([updated.name.as_str()]))
                .await?;
        }
        Ok(updated)
    }

    /// Fails with a foreign key violation while orders reference it.
    pub async fn delete(&mut self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(
        &mut self,
        params: &ListParams,
        sort: Option<SortSpec>,
    ) -> DbResult<(Vec<Product>, i64)> {
        let spec = ListSpec {
            select: "SELECT id, name, summary, price_cents, image_file, category_id, \
                     price_cents AS price FROM products",
            count: "SELECT COUNT(*) FROM products",
            id_column: "id",
            search_column: Some("search_text"),
            filters: Vec::new(),
        };
        fetch_page(self.conn, &spec, params, sort).await
    }

    pub async fn count(&mut self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
