//! Request extractors.
//!
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! AuthUser ── missing/garbled header ──► 403 "Not authenticated."
//!        │ ── bad token / user gone ───► 403 "Token is not valid."
//!        │    (stamps last_login_date in its own short transaction)
//!        ▼
//! AdminUser ── not is_admin ───────────► 403 "Access denied."
//! ```
//!
//! Body, query and path rejections are reported in the regular 422 error
//! shape instead of axum's plain-text defaults.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use tavola_core::{ListParams, User, Validate, ValidationError};

use crate::auth::extract_bearer_token;
use crate::error::ApiError;
use crate::SharedState;

// =============================================================================
// Authentication
// =============================================================================

/// The user named by a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or(ApiError::NotAuthenticated)?;

        // Committed before the handler opens its own session.
        let mut session = state.db.begin().await?;
        let mut user = match state.tokens.user_from_token(&mut session, token).await {
            Ok(user) => user,
            Err(e) => {
                warn!(uri = %parts.uri, error = %e, "Rejected bearer token");
                return Err(e.into());
            }
        };

        let now = Utc::now();
        session.users().touch_last_login(user.id, now).await?;
        session.commit().await?;
        user.last_login_date = now;

        debug!(user_id = user.id, "Authenticated");
        let auth = AuthUser(user);
        parts.extensions.insert(auth.clone());
        Ok(auth)
    }
}

/// An authenticated administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<SharedState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_admin {
            warn!(user_id = user.id, uri = %parts.uri, "Admin route denied");
            return Err(ApiError::AccessDenied);
        }

        Ok(AdminUser(user))
    }
}

// =============================================================================
// Body, Query, Path
// =============================================================================

fn malformed(field: &str, reason: String) -> ApiError {
    ApiError::invalid(ValidationError::InvalidFormat {
        field: field.to_string(),
        reason,
    })
}

/// JSON body that is deserialized and then validated.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| malformed("body", rejection.body_text()))?;

        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// `offset`, `limit`, `search` and `sort` from the query string.
#[derive(Debug, Clone)]
pub struct ListQuery(pub ListParams);

impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<ListParams>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| malformed("query", rejection.body_text()))?;
        Ok(ListQuery(params))
    }
}

/// Path parameters, e.g. the `{id}` of `/products/{id}`.
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: PathRejection| malformed("path", rejection.body_text()))?;
        Ok(ApiPath(value))
    }
}
