//! HTTP routes.
//!
//! ```text
//! /health                       public
//! {prefix}/users, /auth         public
//! {prefix}/products             public
//! {prefix}/categories, /me/*    AuthUser
//! {prefix}/admin/*              AdminUser
//! ```
//!
//! Guards are extractors on each handler, so an unauthenticated request to
//! an unknown path still gets a plain 404.

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::SharedState;

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod health;
pub mod me;
pub mod users;

/// Every versioned route, without prefix or middleware.
fn api_routes() -> Router<SharedState> {
    Router::new()
        .merge(users::router())
        .merge(auth::router())
        .merge(me::router())
        .merge(catalog::router())
        .merge(admin::router())
}

/// Build the fully configured application.
pub fn build_router(state: SharedState) -> Router {
    let prefix = state.config.api_prefix.clone();

    let router = Router::new().merge(health::router());
    let router = if prefix.is_empty() {
        router.merge(api_routes())
    } else {
        router.nest(&prefix, api_routes())
    };

    router
        // CORS - any origin, the API is token based
        .layer(CorsLayer::permissive())
        // Trace - one span per request
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
