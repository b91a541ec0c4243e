//! # Order Repository
//!
//! Orders and their lines. Totals are never stored: a loaded order sums its
//! item snapshots, and listings compute the same sum in SQL so they can sort
//! by it.
//!
//! ## Listing Query
//! ```text
//! orders o
//!   LEFT JOIN (SELECT order_id, SUM(quantity * product_price_cents) AS total
//!              FROM order_items GROUP BY order_id) t ON t.order_id = o.id
//!   → one row per order with `total_price`, sortable like any column
//! ```

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use crate::error::DbResult;
use crate::listing::{fetch_page, search_text, ListSpec};
use tavola_core::order::OrderLine;
use tavola_core::{CoreResult, ListParams, Order, OrderDetails, OrderItem, OrderStatus, SortSpec};

/// An order row with its total computed by the database.
#[derive(Debug, Clone, FromRow)]
pub struct OrderWithTotal {
    #[sqlx(flatten)]
    pub order: Order,
    #[sqlx(rename = "total_price")]
    pub total_price_cents: i64,
}

/// Repository for order database operations.
pub struct OrderRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> OrderRepository<'c> {
    pub const SORTABLE: &'static [&'static str] = &["total_price", "ordered_at", "status"];

    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        OrderRepository { conn }
    }

    /// Inserts an order with its priced lines.
    ///
    /// Runs on the session transaction, so a failing line leaves no
    /// half-written order behind once the session is dropped.
    pub async fn create(
        &mut self,
        user_id: i64,
        address_id: Option<i64>,
        comments: Option<&str>,
        lines: &[OrderLine],
    ) -> DbResult<OrderDetails> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (user_id, address_id, status, ordered_at, comments, search_text)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, user_id, address_id, status, ordered_at, comments
            "#,
        )
        .bind(user_id)
        .bind(address_id)
        .bind(OrderStatus::Awaiting)
        .bind(Utc::now())
        .bind(comments)
        .bind(search_text([
            comments.unwrap_or_default(),
            OrderStatus::Awaiting.as_str(),
        ]))
        .fetch_one(&mut *self.conn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let item = sqlx::query_as::<_, OrderItem>(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, product_price_cents)
                VALUES (?, ?, ?, ?)
                RETURNING id, order_id, product_id, quantity, product_price_cents
                "#,
            )
            .bind(order.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .fetch_one(&mut *self.conn)
            .await?;
            items.push(item);
        }

        debug!(order_id = order.id, user_id, lines = items.len(), "Order inserted");
        Ok(OrderDetails::new(order, items)?)
    }

    /// Loads one of the user's orders with its items.
    pub async fn find_for_user(
        &mut self,
        user_id: i64,
        order_id: i64,
    ) -> DbResult<Option<OrderDetails>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, address_id, status, ordered_at, comments
            FROM orders
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, quantity, product_price_cents
            FROM order_items
            WHERE order_id = ?
            ORDER BY id
            "#,
        )
        .bind(order.id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(Some(OrderDetails::new(order, items)?))
    }

    /// Items of several orders in one query, grouped by order id.
    pub async fn items_for_orders(
        &mut self,
        order_ids: &[i64],
    ) -> DbResult<HashMap<i64, Vec<OrderItem>>> {
        let mut grouped: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, order_id, product_id, quantity, product_price_cents \
             FROM order_items WHERE order_id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in order_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");

        let items = qb.build_query_as::<OrderItem>().fetch_all(&mut *self.conn).await?;
        for item in items {
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    /// Pages through the user's orders, items included.
    pub async fn list_for_user(
        &mut self,
        user_id: i64,
        params: &ListParams,
        sort: Option<SortSpec>,
    ) -> DbResult<(Vec<OrderDetails>, i64)> {
        let spec = ListSpec {
            select: "SELECT o.id AS id, o.user_id AS user_id, o.address_id AS address_id, \
                     o.status AS status, o.ordered_at AS ordered_at, o.comments AS comments, \
                     COALESCE(t.total, 0) AS total_price \
                     FROM orders o \
                     LEFT JOIN (SELECT order_id, SUM(quantity * product_price_cents) AS total \
                                FROM order_items GROUP BY order_id) t ON t.order_id = o.id",
            count: "SELECT COUNT(*) FROM orders o",
            id_column: "o.id",
            search_column: Some("o.search_text"),
            filters: Vec::new(),
        }
        .filter("o.user_id", user_id);

        let (rows, total) = fetch_page::<OrderWithTotal>(self.conn, &spec, params, sort).await?;

        let ids: Vec<i64> = rows.iter().map(|row| row.order.id).collect();
        let mut items = self.items_for_orders(&ids).await?;

        let orders = rows
            .into_iter()
            .map(|row| {
                let order_items = items.remove(&row.order.id).unwrap_or_default();
                OrderDetails::new(row.order, order_items)
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok((orders, total))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig, DbSession};
    use tavola_core::order::price_order_lines;
    use tavola_core::{NewAddress, NewCategory, NewOrderItem, NewProduct, NewUser, ProductChanges};

    struct Fixture {
        user_id: i64,
        margherita: i64,
        tiramisu: i64,
    }

    async fn fixture(session: &mut DbSession) -> Fixture {
        let user = NewUser {
            first_name: "Giulia".to_string(),
            last_name: "Verdi".to_string(),
            email: "giulia@example.com".to_string(),
            password: String::new(),
            phone_number: None,
            birth_date: None,
        };
        let user_id = session.users().create(&user, "h", false, false).await.unwrap().id;

        let category = session
            .categories()
            .create(&NewCategory {
                name: "Menu".to_string(),
            })
            .await
            .unwrap()
            .id;

        let create = |name: &str, price_cents: i64| NewProduct {
            name: name.to_string(),
            summary: String::new(),
            price_cents,
            category_id: category,
            picture_data: None,
        };
        let margherita = create("Margherita", 1250);
        let tiramisu = create("Tiramisù", 690);

        let margherita = session.products().create(&margherita, None).await.unwrap().id;
        let tiramisu = session.products().create(&tiramisu, None).await.unwrap().id;

        Fixture {
            user_id,
            margherita,
            tiramisu,
        }
    }

    async fn place(
        session: &mut DbSession,
        user_id: i64,
        address_id: Option<i64>,
        items: &[NewOrderItem],
    ) -> OrderDetails {
        let ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
        let products = session.products().find_by_ids(&ids).await.unwrap();
        let lines = price_order_lines(items, &products).unwrap();
        session
            .orders()
            .create(user_id, address_id, None, &lines)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_total_uses_price_snapshot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();
        let f = fixture(&mut session).await;

        let items = [
            NewOrderItem {
                product_id: f.margherita,
                quantity: 2,
            },
            NewOrderItem {
                product_id: f.tiramisu,
                quantity: 1,
            },
        ];
        let placed = place(&mut session, f.user_id, None, &items).await;
        assert_eq!(placed.total_price.cents(), 2 * 1250 + 690);
        assert_eq!(placed.order.status, OrderStatus::Awaiting);

        session
            .products()
            .update(
                f.margherita,
                &ProductChanges {
                    price_cents: Some(9900),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reloaded = session
            .orders()
            .find_for_user(f.user_id, placed.order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.total_price.cents(), 2 * 1250 + 690);
        assert_eq!(reloaded.order_items.len(), 2);
    }

    #[tokio::test]
    async fn test_list_sorted_by_total() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();
        let f = fixture(&mut session).await;

        let small = place(
            &mut session,
            f.user_id,
            None,
            &[NewOrderItem {
                product_id: f.tiramisu,
                quantity: 1,
            }],
        )
        .await;
        let large = place(
            &mut session,
            f.user_id,
            None,
            &[NewOrderItem {
                product_id: f.margherita,
                quantity: 3,
            }],
        )
        .await;

        let params = ListParams {
            sort: Some("-total_price".to_string()),
            ..Default::default()
        };
        let sort = params.resolve(OrderRepository::SORTABLE).unwrap();
        let (orders, total) = session
            .orders()
            .list_for_user(f.user_id, &params, sort)
            .await
            .unwrap();

        assert_eq!(total, 2);
        let ids: Vec<i64> = orders.iter().map(|o| o.order.id).collect();
        assert_eq!(ids, vec![large.order.id, small.order.id]);
        assert_eq!(orders[0].total_price.cents(), 3750);
        assert_eq!(orders[0].order_items.len(), 1);
    }

    #[tokio::test]
    async fn test_search_comments_and_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();
        let f = fixture(&mut session).await;

        let products = session.products().find_by_ids(&[f.tiramisu]).await.unwrap();
        let items = [NewOrderItem {
            product_id: f.tiramisu,
            quantity: 1,
        }];
        let lines = price_order_lines(&items, &products).unwrap();
        let noted = session
            .orders()
            .create(f.user_id, None, Some("Più cacao, grazie"), &lines)
            .await
            .unwrap();
        place(&mut session, f.user_id, None, &items).await;

        let search = |term: &str| ListParams {
            search: Some(term.to_string()),
            ..Default::default()
        };

        let (orders, total) = session
            .orders()
            .list_for_user(f.user_id, &search("PIÙ CACAO"), None)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(orders[0].order.id, noted.order.id);

        let (_, total) = session
            .orders()
            .list_for_user(f.user_id, &search("awaiting"), None)
            .await
            .unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_orders_are_scoped_to_owner() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();
        let f = fixture(&mut session).await;

        let placed = place(
            &mut session,
            f.user_id,
            None,
            &[NewOrderItem {
                product_id: f.tiramisu,
                quantity: 1,
            }],
        )
        .await;

        assert!(session
            .orders()
            .find_for_user(f.user_id + 1, placed.order.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_deleting_address_keeps_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();
        let f = fixture(&mut session).await;

        let address = session
            .addresses()
            .create(
                f.user_id,
                &NewAddress {
                    city: "Bologna".to_string(),
                    street: "Via Rizzoli".to_string(),
                    street_number: 3,
                    postal_code: "40125".to_string(),
                },
            )
            .await
            .unwrap();

        let placed = place(
            &mut session,
            f.user_id,
            Some(address.id),
            &[NewOrderItem {
                product_id: f.margherita,
                quantity: 1,
            }],
        )
        .await;
        assert_eq!(placed.order.address_id, Some(address.id));

        session
            .addresses()
            .delete_for_user(f.user_id, address.id)
            .await
            .unwrap();

        let reloaded = session
            .orders()
            .find_for_user(f.user_id, placed.order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.order.address_id, None);
    }

    #[tokio::test]
    async fn test_product_in_order_cannot_be_deleted() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = db.begin().await.unwrap();
        let f = fixture(&mut session).await;

        place(
            &mut session,
            f.user_id,
            None,
            &[NewOrderItem {
                product_id: f.margherita,
                quantity: 1,
            }],
        )
        .await;

        let err = session.products().delete(f.margherita).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
