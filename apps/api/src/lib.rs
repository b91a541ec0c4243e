//! # Tavola API
//!
//! REST server for the restaurant backend: accounts, address books, the
//! menu catalog and orders.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tavola API                                     │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  /v1/users     │  │  /v1/me        │  │  /v1/admin                 ││
//! │  │                │  │                │  │                            ││
//! │  │ • register     │  │ • profile      │  │ • categories               ││
//! │  │ • reset pwd    │  │ • addresses    │  │ • products (+ pictures)    ││
//! │  │                │  │ • orders       │  │ • users                    ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────┐            │
//! │  │  /v1/auth      │  │  /v1/products  │  │  /health       │            │
//! │  │ • token        │  │  /v1/categories│  │                │            │
//! │  │ • refresh      │  │                │  │                │            │
//! │  └────────────────┘  └────────────────┘  └────────────────┘            │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │  SQLite      │  │  SMTP        │  │    JWT Auth              ││  │
//! │  │  │  (tavola-db) │  │  (lettre)    │  │    HS256 + argon2        ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables, see [`config::ApiConfig::load`]:
//! - `DATABASE_URL` - SQLite URL (default: `sqlite://tavola.db`)
//! - `TAVOLA_PORT` - HTTP port (default: 8080)
//! - `TAVOLA_API_PREFIX` - route prefix (default: `/v1`)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `JWT_ACCESS_LIFETIME_SECS` - Access token lifetime (default: 3600)
//! - `JWT_REFRESH_LIFETIME_SECS` - Refresh token lifetime (default: 604800)
//! - `MAIL_*` - SMTP settings; mail is only logged unless
//!   `MAIL_SUPPRESS_SEND=false`

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod password;
pub mod routes;
pub mod services;

use std::sync::Arc;

use tavola_db::Database;

// Re-exports
pub use auth::TokenBackend;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use services::{Mailer, PictureStore};

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub config: ApiConfig,
    pub tokens: TokenBackend,
    pub mailer: Arc<dyn Mailer>,
    pub pictures: PictureStore,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig, mailer: Arc<dyn Mailer>) -> Self {
        AppState {
            tokens: TokenBackend::from_config(&config),
            pictures: PictureStore::new(config.static_folder_path.clone()),
            db,
            config,
            mailer,
        }
    }
}

pub type SharedState = Arc<AppState>;
