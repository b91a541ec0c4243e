//! Registration and password reset.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use tavola_core::validation::{validate_email, validate_not_blank, validate_password};
use tavola_core::{NewUser, Validate, ValidationErrors};

use crate::auth::TokenError;
use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::services::email::{password_reset, spawn_send};
use crate::services::{UserService, UserView};
use crate::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/password", post(request_password_reset).patch(reset_password))
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

impl Validate for PasswordResetRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        validate_email(&self.email).map_err(ValidationErrors::from)
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordReset {
    pub token: String,
    pub password: String,
}

impl Validate for PasswordReset {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_not_blank("token", &self.token));
        errors.check(validate_password(&self.password));
        errors.into_result()
    }
}

async fn register(
    State(state): State<SharedState>,
    ValidJson(payload): ValidJson<NewUser>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let mut session = state.db.begin().await?;
    let user = UserService::new(&mut session).create_user(&payload).await?;
    session.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(UserView {
            user,
            delivery_address: None,
        }),
    ))
}

/// Emails a short-lived reset token. Responds before the mail is sent.
async fn request_password_reset(
    State(state): State<SharedState>,
    ValidJson(payload): ValidJson<PasswordResetRequest>,
) -> ApiResult<StatusCode> {
    let mut session = state.db.begin().await?;
    let user = UserService::new(&mut session)
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("User with email '{}' does not exist.", payload.email))
        })?;
    drop(session);

    let token = state.tokens.password_reset_token(user.id)?;
    spawn_send(
        state.mailer.clone(),
        password_reset(&user, &token, state.config.password_reset_lifetime_secs),
    );

    info!(user_id = user.id, "Password reset requested");
    Ok(StatusCode::ACCEPTED)
}

async fn reset_password(
    State(state): State<SharedState>,
    ValidJson(payload): ValidJson<PasswordReset>,
) -> ApiResult<StatusCode> {
    let mut session = state.db.begin().await?;

    let user = match state.tokens.user_from_token(&mut session, &payload.token).await {
        Ok(user) => user,
        Err(TokenError::InvalidToken) => return Err(ApiError::InvalidResetToken),
        Err(e) => return Err(e.into()),
    };

    UserService::new(&mut session)
        .set_password(user.id, &payload.password)
        .await?;
    session.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
