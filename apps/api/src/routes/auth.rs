//! Token issue and refresh.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tavola_core::validation::{validate_email, validate_not_blank};
use tavola_core::{Validate, ValidationErrors};

use crate::auth::TokenPair;
use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::services::UserService;
use crate::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/auth/token", post(issue_tokens))
        .route("/auth/refresh", post(refresh))
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Validate for Credentials {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_email(&self.email));
        errors.check(validate_not_blank("password", &self.password));
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

impl Validate for RefreshRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        validate_not_blank("refresh", &self.refresh).map_err(ValidationErrors::from)
    }
}

#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access: String,
}

async fn issue_tokens(
    State(state): State<SharedState>,
    ValidJson(credentials): ValidJson<Credentials>,
) -> ApiResult<Json<TokenPair>> {
    let mut session = state.db.begin().await?;
    let user = UserService::new(&mut session)
        .authenticate(&credentials.email, &credentials.password)
        .await
        .inspect_err(|e| warn!(email = %credentials.email, error = %e, "Login failed"))?;
    drop(session);

    let pair = state.tokens.token_pair(user.id)?;
    info!(user_id = user.id, "Tokens issued");
    Ok(Json(pair))
}

async fn refresh(
    State(state): State<SharedState>,
    ValidJson(request): ValidJson<RefreshRequest>,
) -> ApiResult<Json<AccessToken>> {
    let claims = state
        .tokens
        .verify(&request.refresh)
        .map_err(|_| ApiError::InvalidRefreshToken)?;

    let mut session = state.db.begin().await?;
    let user = session
        .users()
        .find_by_id(claims.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User with id from payload was not found.".to_string()))?;
    drop(session);

    Ok(Json(AccessToken {
        access: state.tokens.access_token(user.id)?,
    }))
}
