//! Order placement and history.
//!
//! ```text
//! NewOrder + NewAddress
//!     │ validate (unique products, positive quantities)
//!     ▼
//! products WHERE id IN (...)  ──► missing ids? → 400
//!     │
//!     ▼
//! find-or-create address ──► insert order + snapshot-priced items
//! ```
//!
//! Everything runs on the caller's session; the confirmation email is
//! sent by the handler once the session committed.

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use tavola_core::order::{price_order_lines, referenced_product_ids};
use tavola_core::{Address, ListParams, NewAddress, NewOrder, OrderDetails, Page, User, Validate};
use tavola_db::{DbSession, OrderRepository};

use crate::error::{ApiError, ApiResult};

/// An order as returned to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub order: OrderDetails,

    /// `None` when the address was deleted after ordering.
    pub delivery_address: Option<Address>,
}

pub struct OrderService<'s> {
    session: &'s mut DbSession,
}

impl<'s> OrderService<'s> {
    pub fn new(session: &'s mut DbSession) -> Self {
        OrderService { session }
    }

    pub async fn create_order(
        &mut self,
        user: &User,
        order: &NewOrder,
        delivery_address: &NewAddress,
    ) -> ApiResult<(OrderDetails, Address)> {
        order.validate()?;
        delivery_address.validate()?;

        let ids = referenced_product_ids(&order.order_items);
        let products = self.session.products().find_by_ids(&ids).await?;
        let lines = price_order_lines(&order.order_items, &products)?;

        let address = self
            .session
            .addresses()
            .find_or_create(user.id, delivery_address)
            .await?;

        let details = self
            .session
            .orders()
            .create(user.id, Some(address.id), order.comments.as_deref(), &lines)
            .await?;

        info!(
            user_id = user.id,
            order_id = details.order.id,
            items = details.order_items.len(),
            total = %details.total_price,
            "Order created"
        );
        Ok((details, address))
    }

    pub async fn get_order(&mut self, user_id: i64, order_id: i64) -> ApiResult<OrderView> {
        let order = self
            .session
            .orders()
            .find_for_user(user_id, order_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Order with id '{}' does not exist.", order_id)))?;

        let delivery_address = match order.order.address_id {
            Some(address_id) => self.session.addresses().find_for_user(user_id, address_id).await?,
            None => None,
        };

        Ok(OrderView {
            order,
            delivery_address,
        })
    }

    pub async fn list_orders(&mut self, user_id: i64, params: &ListParams) -> ApiResult<Page<OrderView>> {
        let sort = params.resolve(OrderRepository::SORTABLE)?;
        let (orders, total) = self
            .session
            .orders()
            .list_for_user(user_id, params, sort)
            .await?;

        let mut address_ids: Vec<i64> = orders.iter().filter_map(|o| o.order.address_id).collect();
        address_ids.sort_unstable();
        address_ids.dedup();

        let addresses: HashMap<i64, Address> = self
            .session
            .addresses()
            .find_by_ids(&address_ids)
            .await?
            .into_iter()
            .map(|address| (address.id, address))
            .collect();

        let page = Page::new(orders, total, params).map(|order| {
            let delivery_address = order
                .order
                .address_id
                .and_then(|id| addresses.get(&id).cloned());
            OrderView {
                order,
                delivery_address,
            }
        });
        Ok(page)
    }
}
