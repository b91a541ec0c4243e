//! JWT authentication module.
//!
//! Handles token generation and validation. Access, refresh and
//! password-reset tokens carry the same claims and differ only in lifetime.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use tavola_core::User;
use tavola_db::{DbError, DbSession};

use crate::config::ApiConfig;

/// JWT claims structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the user the token was issued for
    pub user_id: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Token errors. Every verification failure is the same `InvalidToken`.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Failed to generate token: {0}")]
    Encoding(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

/// Access and refresh tokens issued at login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// JWT token backend (HS256).
pub struct TokenBackend {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_lifetime_secs: i64,
    refresh_lifetime_secs: i64,
    reset_lifetime_secs: i64,
}

impl TokenBackend {
    /// Create a new token backend.
    pub fn new(
        secret: &str,
        access_lifetime_secs: i64,
        refresh_lifetime_secs: i64,
        reset_lifetime_secs: i64,
    ) -> Self {
        TokenBackend {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_lifetime_secs,
            refresh_lifetime_secs,
            reset_lifetime_secs,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        TokenBackend::new(
            &config.jwt_secret,
            config.jwt_access_lifetime_secs,
            config.jwt_refresh_lifetime_secs,
            config.password_reset_lifetime_secs,
        )
    }

    fn issue(&self, user_id: i64, lifetime_secs: i64) -> Result<String, TokenError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(lifetime_secs);

        let claims = Claims {
            user_id,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Generate an access token.
    pub fn access_token(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue(user_id, self.access_lifetime_secs)
    }

    /// Generate a refresh token.
    pub fn refresh_token(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue(user_id, self.refresh_lifetime_secs)
    }

    /// Generate a short-lived token sent by email to reset a password.
    pub fn password_reset_token(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue(user_id, self.reset_lifetime_secs)
    }

    pub fn token_pair(&self, user_id: i64) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.access_token(user_id)?,
            refresh: self.refresh_token(user_id)?,
        })
    }

    /// Validate and decode a token.
    ///
    /// Checks the signature, that `user_id`, `iat` and `exp` are present, and
    /// expiry against the current time with no leeway.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::InvalidToken)
    }

    /// Resolve the user a token was issued for. A user that no longer
    /// exists makes the token invalid.
    pub async fn user_from_token(
        &self,
        session: &mut DbSession,
        token: &str,
    ) -> Result<User, TokenError> {
        let claims = self.verify(token)?;
        session
            .users()
            .find_by_id(claims.user_id)
            .await?
            .ok_or(TokenError::InvalidToken)
    }
}

/// Extract bearer token from authorization header.
///
/// The scheme name is case-insensitive (RFC 7235), so `bearer` and
/// `BEARER` are accepted as well.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    let (scheme, token) = auth_header.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|token| !token.is_empty())
}
