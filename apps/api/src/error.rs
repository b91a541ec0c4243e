//! # API Errors
//!
//! The HTTP boundary of the error stack.
//!
//! ```text
//! CoreError ──┐
//! DbError ────┼──► ApiError ──► IntoResponse
//! TokenError ─┘                   │
//!                                 ▼
//!            {"detail": {"message": "...", "code": 400}}
//!            {"detail": {"message": "...", "code": 422, "errors": [{field, message}]}}
//! ```
//!
//! Internal failures are logged with their cause and answered with a
//! generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use tavola_core::{CoreError, ValidationError, ValidationErrors};
use tavola_db::DbError;

use crate::auth::TokenError;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A unique field collides with an existing row.
    #[error("{0}")]
    AlreadyExists(String),

    /// Request is well-formed but references data that does not exist,
    /// or would break a reference between rows.
    #[error("{0}")]
    BadRequest(String),

    #[error("Category with id '{0}' does not exist.")]
    CategoryDoesNotExist(i64),

    #[error("Address with id '{0}' does not exist.")]
    AddressDoesNotExist(i64),

    #[error("The provided token is not valid.")]
    InvalidResetToken,

    #[error("Incorrect email or password.")]
    InvalidCredentials,

    #[error("Refresh token is invalid")]
    InvalidRefreshToken,

    /// No bearer token, or a header that is not `Bearer <token>`.
    #[error("Not authenticated.")]
    NotAuthenticated,

    /// Bad signature, expired, or the user it names is gone.
    #[error("Token is not valid.")]
    InvalidToken,

    #[error("Access denied.")]
    AccessDenied,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for handlers and services.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AlreadyExists(_)
            | ApiError::BadRequest(_)
            | ApiError::CategoryDoesNotExist(_)
            | ApiError::AddressDoesNotExist(_)
            | ApiError::InvalidResetToken => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            ApiError::NotAuthenticated | ApiError::InvalidToken | ApiError::AccessDenied => {
                StatusCode::FORBIDDEN
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Single-field validation failure.
    pub fn invalid(error: ValidationError) -> Self {
        ApiError::Validation(ValidationErrors::from(error))
    }
}

// =============================================================================
// Response Body
// =============================================================================

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: ErrorDetail,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, errors) = match &self {
            ApiError::Internal(cause) => {
                error!(cause = %cause, "Request failed");
                ("Internal server error.".to_string(), None)
            }
            ApiError::Validation(errors) => {
                let fields = errors
                    .errors()
                    .iter()
                    .map(|e| FieldError {
                        field: e.field().to_string(),
                        message: e.to_string(),
                    })
                    .collect();
                (errors.to_string(), Some(fields))
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            detail: ErrorDetail {
                message,
                code: status.as_u16(),
                errors,
            },
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// Human message for a UNIQUE violation on `table.column`.
fn already_exists_message(field: &str, value: &str) -> String {
    let entity = match field.split('.').next() {
        Some("users") => "User",
        Some("products") => "Product",
        Some("categories") => "Category",
        Some("employee_profiles") => "Employee profile",
        _ => "Record",
    };
    let column = field.rsplit('.').next().unwrap_or(field);
    let column = if column == "user_id" { "user id" } else { column };
    format!("{} with {} '{}' already exists.", entity, column, value)
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { field, value } => {
                ApiError::AlreadyExists(already_exists_message(&field, &value))
            }
            DbError::ForeignKeyViolation { message } => {
                warn!(%message, "Foreign key violation");
                ApiError::BadRequest(
                    "The operation conflicts with records that reference this entity."
                        .to_string(),
                )
            }
            DbError::Domain(core) => ApiError::from(core),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(errors) => ApiError::Validation(errors),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => ApiError::InvalidToken,
            TokenError::Encoding(cause) => ApiError::Internal(cause),
            TokenError::Database(db) => ApiError::from(db),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (status, body) = body_json(ApiError::AccessDenied).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"]["message"], "Access denied.");
        assert_eq!(body["detail"]["code"], 403);
        assert!(body["detail"].get("errors").is_none());
    }

    #[tokio::test]
    async fn test_validation_lists_fields() {
        let error = ApiError::invalid(ValidationError::DuplicateOrderItems);
        let (status, body) = body_json(error).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"]["errors"][0]["field"], "order_items");
        assert_eq!(body["detail"]["errors"][0]["message"], "Order items must be unique.");
    }

    #[tokio::test]
    async fn test_internal_cause_is_hidden() {
        let (status, body) = body_json(ApiError::Internal("disk on fire".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"]["message"], "Internal server error.");
    }

    #[test]
    fn test_unique_violation_message() {
        let error = ApiError::from(DbError::duplicate("users.email", "ada@example.com"));
        assert_eq!(error.to_string(), "User with email 'ada@example.com' already exists.");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);

        let error = ApiError::from(DbError::duplicate("products.name", "Margherita"));
        assert_eq!(error.to_string(), "Product with name 'Margherita' already exists.");
    }

    #[test]
    fn test_missing_products_are_bad_request() {
        let error = ApiError::from(CoreError::ProductsDoNotExist { ids: vec![1, 7] });
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "Products with ids '{1, 7}' do not exist.");
    }

    #[test]
    fn test_total_overflow_from_db_is_bad_request() {
        let error = ApiError::from(DbError::from(CoreError::TotalOverflow));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "Order total exceeds the supported amount.");
    }
}
