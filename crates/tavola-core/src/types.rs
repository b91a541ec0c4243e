//! # Domain Types
//!
//! Entities persisted by tavola-db and the request payloads that create or
//! change them.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐ 1:N ┌─────────────────┐       ┌─────────────────┐ │
//! │  │      User       │────►│     Address     │◄──────│      Order      │ │
//! │  │  email (unique) │     │  city, street   │ 0..1  │  status         │ │
//! │  │  is_admin       │     │  number, postal │       │  ordered_at     │ │
//! │  └───────┬─────────┘     └─────────────────┘       └───────┬─────────┘ │
//! │          │ 0..1                                            │ 1:N       │
//! │  ┌───────▼─────────┐     ┌─────────────────┐       ┌───────▼─────────┐ │
//! │  │ EmployeeProfile │     │    Category     │       │    OrderItem    │ │
//! │  │  salary         │     │  name (unique)  │       │  quantity       │ │
//! │  └─────────────────┘     └───────┬─────────┘       │  price snapshot │ │
//! │                                  │ 1:N             └───────┬─────────┘ │
//! │                          ┌───────▼─────────┐               │ N:1       │
//! │                          │     Product     │◄──────────────┘           │
//! │                          │  price_cents    │                           │
//! │                          └─────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Entities vs Payloads
//! - Entities (`User`, `Product`, ...) mirror table rows and carry the
//!   database id. They derive `sqlx::FromRow` when the `sqlx` feature is on.
//! - Payloads (`NewUser`, `ProductChanges`, ...) are what clients send.
//!   `New*` creates a row; `*Changes` is a partial update where `None`
//!   leaves the column untouched.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::order::{order_total, PricedLine};

// =============================================================================
// User
// =============================================================================

/// A registered account. Admins manage the catalog; employees carry a
/// profile with salary data.
#[derive(Debug, Clone, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: i64,

    /// Login identifier, unique across users.
    pub email: String,

    /// argon2 PHC string. Never leaves the server.
    #[serde(skip_serializing)]
    #[ts(skip)]
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,

    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,

    pub is_admin: bool,
    pub is_employee: bool,

    #[ts(as = "String")]
    pub registered_at: DateTime<Utc>,

    /// Stamped on every authenticated request.
    #[ts(as = "String")]
    pub last_login_date: DateTime<Utc>,
}

/// Self-registration payload (`POST /users`).
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,
}

/// Account creation by an administrator; may grant roles and attach an
/// employee profile.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct NewUserByAdmin {
    #[serde(flatten)]
    pub user: NewUser,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_employee: bool,
    #[serde(default)]
    pub employee_profile: Option<NewEmployeeProfile>,
}

/// Partial update of the authenticated user's own data.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct UserChanges {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,
}

// =============================================================================
// Employee Profile
// =============================================================================

/// HR data kept for users flagged as employees.
#[derive(Debug, Clone, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct EmployeeProfile {
    pub id: i64,
    pub user_id: i64,
    pub salary_cents: i64,
    pub available_holidays: i64,
    #[ts(as = "Option<String>")]
    pub hire_date: Option<NaiveDate>,
}

impl EmployeeProfile {
    #[inline]
    pub fn salary(&self) -> Money {
        Money::from_cents(self.salary_cents)
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct NewEmployeeProfile {
    pub salary_cents: i64,
    #[serde(default)]
    pub available_holidays: i64,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub hire_date: Option<NaiveDate>,
}

// =============================================================================
// Address
// =============================================================================

/// A delivery address in a user's address book.
#[derive(Debug, Clone, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub city: String,
    pub street: String,
    pub street_number: i64,
    pub postal_code: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// One-line rendering used in confirmation emails.
    pub fn full_address(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            self.street, self.street_number, self.postal_code, self.city
        )
    }

    /// Whether this row holds exactly the submitted address.
    pub fn matches(&self, candidate: &NewAddress) -> bool {
        self.city == candidate.city
            && self.street == candidate.street
            && self.street_number == candidate.street_number
            && self.postal_code == candidate.postal_code
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, TS)]
#[ts(export)]
pub struct NewAddress {
    pub city: String,
    pub street: String,
    pub street_number: i64,
    pub postal_code: String,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct AddressChanges {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub street_number: Option<i64>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct CategoryChanges {
    #[serde(default)]
    pub name: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A dish or drink on the menu.
#[derive(Debug, Clone, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Display name, unique across the catalog.
    pub name: String,

    pub summary: String,

    /// Current price in cents. Orders keep their own snapshot.
    pub price_cents: i64,

    /// Path of the uploaded picture under the static folder.
    pub image_file: Option<String>,

    pub category_id: i64,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Encoding of an uploaded product picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PictureFormat {
    Jpeg,
    Png,
}

impl PictureFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            PictureFormat::Jpeg => "jpeg",
            PictureFormat::Png => "png",
        }
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct PictureData {
    pub base64_encoded_image: String,
    pub picture_format: PictureFormat,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    pub price_cents: i64,
    pub category_id: i64,
    #[serde(default)]
    pub picture_data: Option<PictureData>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct ProductChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

// =============================================================================
// Order Status
// =============================================================================

/// Delivery progress of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum OrderStatus {
    /// Placed, not yet picked up by a courier.
    #[default]
    Awaiting,
    InDelivery,
    Delivered,
}

impl OrderStatus {
    /// The stored and serialized name.
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Awaiting => "AWAITING",
            OrderStatus::InDelivery => "IN_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// Order header. The total is derived from its items, never stored.
#[derive(Debug, Clone, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,

    /// `None` once the delivery address was deleted from the address book.
    pub address_id: Option<i64>,

    pub status: OrderStatus,

    #[ts(as = "String")]
    pub ordered_at: DateTime<Utc>,

    pub comments: Option<String>,
}

/// One line of an order with the price captured at order time.
#[derive(Debug, Clone, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,

    /// Snapshot of `Product::price_cents` when the order was placed.
    pub product_price_cents: i64,
}

impl OrderItem {
    #[inline]
    pub fn product_price(&self) -> Money {
        Money::from_cents(self.product_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> CoreResult<Money> {
        PricedLine::from(self).line_total()
    }
}

/// An order with its lines and computed total, as returned to clients.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub order_items: Vec<OrderItem>,
    pub total_price: Money,
}

impl OrderDetails {
    /// Assembles the view and computes the total from the item snapshots.
    pub fn new(order: Order, order_items: Vec<OrderItem>) -> CoreResult<Self> {
        let total_price = order_total(order_items.iter().map(PricedLine::from))?;
        Ok(OrderDetails {
            order,
            order_items,
            total_price,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, TS)]
#[ts(export)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct NewOrder {
    #[serde(default)]
    pub comments: Option<String>,
    pub order_items: Vec<NewOrderItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_address() -> Address {
        Address {
            id: 1,
            user_id: 7,
            city: "Kraków".to_string(),
            street: "Floriańska".to_string(),
            street_number: 12,
            postal_code: "31-019".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_full_address() {
        assert_eq!(
            sample_address().full_address(),
            "Floriańska, 12, 31-019, Kraków"
        );
    }

    #[test]
    fn test_address_matches_exact_fields_only() {
        let address = sample_address();
        let mut candidate = NewAddress {
            city: "Kraków".to_string(),
            street: "Floriańska".to_string(),
            street_number: 12,
            postal_code: "31-019".to_string(),
        };
        assert!(address.matches(&candidate));

        candidate.street_number = 13;
        assert!(!address.matches(&candidate));
    }

    #[test]
    fn test_order_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::InDelivery).unwrap(),
            "\"IN_DELIVERY\""
        );
        assert_eq!(OrderStatus::default(), OrderStatus::Awaiting);

        for status in [OrderStatus::Awaiting, OrderStatus::InDelivery, OrderStatus::Delivered] {
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let user = User {
            id: 1,
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone_number: None,
            birth_date: None,
            is_admin: false,
            is_employee: false,
            registered_at: Utc::now(),
            last_login_date: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ada@example.com");
    }

    #[test]
    fn test_admin_payload_flattens_user_fields() {
        let payload: NewUserByAdmin = serde_json::from_value(serde_json::json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "password": "analytical",
            "is_employee": true,
            "employee_profile": { "salary_cents": 450000 }
        }))
        .unwrap();

        assert_eq!(payload.user.email, "ada@example.com");
        assert!(payload.is_employee);
        assert!(!payload.is_admin);
        assert_eq!(payload.employee_profile.unwrap().available_holidays, 0);
    }
}
