//! Service layer.
//!
//! Each service borrows the request's [`DbSession`](tavola_db::DbSession)
//! and returns [`ApiResult`](crate::error::ApiResult), so handlers decide
//! when to commit. Mail and picture storage live beside them.

pub mod category;
pub mod email;
pub mod order;
pub mod picture;
pub mod product;
pub mod user;

pub use category::CategoryService;
pub use email::{Mailer, OutgoingEmail};
pub use order::{OrderService, OrderView};
pub use picture::PictureStore;
pub use product::ProductService;
pub use user::{AdminUserView, UserService, UserView};
