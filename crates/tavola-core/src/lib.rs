//! # tavola-core: Pure Domain Logic for Tavola
//!
//! Everything the restaurant backend knows about users, addresses, the
//! catalog and orders that does not need a database or a socket.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tavola Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/api (axum, /v1 routes)                     │   │
//! │  │    auth extractor ──► handler ──► service ──► transaction       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tavola-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   order   │  │  listing  │  │   │
//! │  │   │ User, ... │  │   Money   │  │  pricing  │  │ sort/page │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tavola-db (Database Layer)                   │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities and request payloads
//! - [`money`] - Money type with integer arithmetic
//! - [`order`] - Order line building and total computation
//! - [`listing`] - Pagination, search and sort parameters
//! - [`error`] - Domain error types
//! - [`validation`] - Field validators and the [`Validate`] trait
//!
//! ## Example Usage
//!
//! ```rust
//! use tavola_core::money::Money;
//! use tavola_core::order::{order_total, PricedLine};
//!
//! let lines = [
//!     PricedLine { unit_price: Money::from_cents(1250), quantity: 2 },
//!     PricedLine { unit_price: Money::from_cents(399), quantity: 1 },
//! ];
//! assert_eq!(order_total(lines).unwrap().cents(), 2899);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod listing;
pub mod money;
pub mod order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError, ValidationErrors};
pub use listing::{ListParams, Page, SortDirection, SortSpec};
pub use money::Money;
pub use types::*;
pub use validation::Validate;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a user's first name.
pub const MAX_FIRST_NAME_LENGTH: usize = 50;

/// Maximum length of a user's last name.
pub const MAX_LAST_NAME_LENGTH: usize = 50;

/// Maximum length of a product name.
pub const MAX_PRODUCT_NAME_LENGTH: usize = 100;

/// Maximum length of a category name.
pub const MAX_CATEGORY_NAME_LENGTH: usize = 50;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Highest product price in cents (9999.99).
pub const MAX_PRICE_CENTS: i64 = 999_999;

/// Most units of one product a single order line may ask for.
pub const MAX_ORDER_QUANTITY: i64 = 1_000;

/// Page size used when the client does not ask for one.
pub const DEFAULT_PAGE_LIMIT: i64 = 50;

/// Largest page a client may request.
pub const MAX_PAGE_LIMIT: i64 = 100;
