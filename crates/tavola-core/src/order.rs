//! # Order Pricing
//!
//! Turns a submitted order into priced lines and computes totals.
//!
//! ## Order Creation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewOrder { order_items: [(product_id, quantity), ...] }                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Validate (duplicate product ids → "Order items must be unique.")      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tavola-db loads every product in ONE query                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  price_order_lines() ← THIS MODULE                                     │
//! │       ├── any id missing? → ProductsDoNotExist { ids }                 │
//! │       ├── total overflows i64? → TotalOverflow                         │
//! │       └── OrderLine { product_id, quantity, unit_price = snapshot }    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tavola-db inserts order + lines in the request transaction            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The snapshot decouples historical orders from later price changes: the
//! total of an order is always Σ(snapshot × quantity).

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{NewOrderItem, OrderItem, Product};

/// Anything that contributes `unit_price × quantity` to a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Money,
    pub quantity: i64,
}

impl PricedLine {
    #[inline]
    pub fn line_total(&self) -> CoreResult<Money> {
        self.unit_price
            .checked_mul_quantity(self.quantity)
            .ok_or(CoreError::TotalOverflow)
    }
}

/// Sum of `unit_price × quantity` over all lines.
pub fn order_total(lines: impl IntoIterator<Item = PricedLine>) -> CoreResult<Money> {
    lines.into_iter().try_fold(Money::zero(), |total, line| {
        total
            .checked_add(line.line_total()?)
            .ok_or(CoreError::TotalOverflow)
    })
}

/// A line ready to be inserted, carrying the captured price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
}

impl From<&OrderLine> for PricedLine {
    fn from(line: &OrderLine) -> Self {
        PricedLine {
            unit_price: line.unit_price,
            quantity: line.quantity,
        }
    }
}

impl From<&OrderItem> for PricedLine {
    fn from(item: &OrderItem) -> Self {
        PricedLine {
            unit_price: item.product_price(),
            quantity: item.quantity,
        }
    }
}

/// Whether every product id appears at most once.
pub fn has_unique_products(items: &[NewOrderItem]) -> bool {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().all(|item| seen.insert(item.product_id))
}

/// Distinct product ids referenced by the order, in submission order.
pub fn referenced_product_ids(items: &[NewOrderItem]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .map(|item| item.product_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Prices each submitted line with the current price of its product.
///
/// `products` is whatever the database returned for
/// [`referenced_product_ids`]; ids it lacks are reported together, sorted.
/// Fails with [`CoreError::TotalOverflow`] when the order could not be
/// totalled, so nothing unpriceable reaches the database.
///
/// ## Example
/// ```rust
/// use tavola_core::order::price_order_lines;
/// use tavola_core::{CoreError, NewOrderItem};
///
/// let items = [NewOrderItem { product_id: 9, quantity: 1 }];
/// let err = price_order_lines(&items, &[]).unwrap_err();
/// assert!(matches!(err, CoreError::ProductsDoNotExist { ref ids } if ids == &[9]));
/// ```
pub fn price_order_lines(items: &[NewOrderItem], products: &[Product]) -> CoreResult<Vec<OrderLine>> {
    let by_id: HashMap<i64, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let missing: BTreeSet<i64> = items
        .iter()
        .map(|item| item.product_id)
        .filter(|id| !by_id.contains_key(id))
        .collect();

    if !missing.is_empty() {
        return Err(CoreError::ProductsDoNotExist {
            ids: missing.into_iter().collect(),
        });
    }

    let lines: Vec<OrderLine> = items
        .iter()
        .filter_map(|item| {
            by_id.get(&item.product_id).map(|product| OrderLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: product.price(),
            })
        })
        .collect();

    order_total(lines.iter().map(PricedLine::from))?;
    Ok(lines)
}

// =============================================================================
// Unit Tests
// =============================================================================
