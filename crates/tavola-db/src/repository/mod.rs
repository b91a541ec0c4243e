//! # Repository Module
//!
//! Database repository implementations for Tavola.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Service (apps/api)                                                    │
//! │       │                                                                 │
//! │       │  session.products().find_by_ids(&[1, 4])                       │
//! │       ▼                                                                 │
//! │  ProductRepository<'c>  (borrows the session's transaction)            │
//! │  ├── find_by_ids(&mut self, ids)                                       │
//! │  ├── find_by_id(&mut self, id)                                         │
//! │  ├── create(&mut self, product, image_file)                            │
//! │  └── update / delete / list                                            │
//! │       │                                                                 │
//! │       │  SQL (runtime-checked, bound parameters)                       │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`] - Accounts, login stamps, password changes
//! - [`AddressRepository`] - Address book with exact-match lookup
//! - [`CategoryRepository`] - Menu categories
//! - [`ProductRepository`] - Menu items
//! - [`OrderRepository`] - Orders, order items, totals
//! - [`EmployeeProfileRepository`] - Payroll data of employees
//!
//! Deletes report whether a row was removed and never fail on a missing id.

pub mod address;
pub mod category;
pub mod employee;
pub mod order;
pub mod product;
pub mod user;

pub use address::AddressRepository;
pub use category::CategoryRepository;
pub use employee::EmployeeProfileRepository;
pub use order::{OrderRepository, OrderWithTotal};
pub use product::ProductRepository;
pub use user::UserRepository;
