//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Development-only signing key. A warning is logged when it is in use.
pub const DEV_JWT_SECRET: &str = "tavola-dev-secret-change-in-production";

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// Prefix of every versioned route, e.g. `/v1`
    pub api_prefix: String,

    /// `sqlite://` URL or `:memory:`
    pub database_url: String,

    pub database_max_connections: u32,

    /// Secret key for signing tokens
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Refresh token lifetime in seconds
    pub jwt_refresh_lifetime_secs: i64,

    /// Password-reset token lifetime in seconds
    pub password_reset_lifetime_secs: i64,

    /// Root of uploaded files; pictures go to `{static}/pictures`
    pub static_folder_path: PathBuf,

    pub mail: MailConfig,
}

/// SMTP settings. With `suppress_send` on, mail is only logged.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub server: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub suppress_send: bool,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ApiConfig {
            host: env::var("TAVOLA_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),

            port: parse_var("TAVOLA_PORT", 8080)?,

            api_prefix: normalize_prefix(
                &env::var("TAVOLA_API_PREFIX").unwrap_or_else(|_| "/v1".to_string()),
            ),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://tavola.db".to_string()),

            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5)?,

            // In production, this MUST be set via environment variable
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),

            jwt_access_lifetime_secs: parse_var("JWT_ACCESS_LIFETIME_SECS", 3600)?, // 1 hour

            jwt_refresh_lifetime_secs: parse_var("JWT_REFRESH_LIFETIME_SECS", 604_800)?, // 7 days

            password_reset_lifetime_secs: parse_var("PASSWORD_RESET_LIFETIME_SECS", 300)?, // 5 minutes

            static_folder_path: PathBuf::from(
                env::var("STATIC_FOLDER_PATH").unwrap_or_else(|_| "static/".to_string()),
            ),

            mail: MailConfig {
                server: env::var("MAIL_SERVER").ok(),
                port: parse_var("MAIL_PORT", 587)?,
                username: env::var("MAIL_USERNAME").ok(),
                password: env::var("MAIL_PASSWORD").ok(),
                from: env::var("MAIL_FROM").ok(),
                suppress_send: parse_var("MAIL_SUPPRESS_SEND", true)?,
            },
        };

        for (name, value) in [
            ("JWT_ACCESS_LIFETIME_SECS", config.jwt_access_lifetime_secs),
            ("JWT_REFRESH_LIFETIME_SECS", config.jwt_refresh_lifetime_secs),
            ("PASSWORD_RESET_LIFETIME_SECS", config.password_reset_lifetime_secs),
        ] {
            if value <= 0 {
                return Err(ConfigError::InvalidValue(name.to_string()));
            }
        }

        if !config.mail.suppress_send {
            if config.mail.server.is_none() {
                return Err(ConfigError::MissingRequired("MAIL_SERVER".to_string()));
            }
            if config.mail.from.is_none() {
                return Err(ConfigError::MissingRequired("MAIL_FROM".to_string()));
            }
        }

        Ok(config)
    }

    /// Configuration for tests: in-memory database, mail suppressed.
    pub fn for_tests(static_folder_path: impl Into<PathBuf>) -> Self {
        ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            api_prefix: "/v1".to_string(),
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            jwt_access_lifetime_secs: 3600,
            jwt_refresh_lifetime_secs: 604_800,
            password_reset_lifetime_secs: 300,
            static_folder_path: static_folder_path.into(),
            mail: MailConfig {
                server: None,
                port: 587,
                username: None,
                password: None,
                from: None,
                suppress_send: true,
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// `v1`, `/v1/` and `/v1` all become `/v1`; an empty prefix stays empty.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/v1"), "/v1");
        assert_eq!(normalize_prefix("v1/"), "/v1");
        assert_eq!(normalize_prefix("/api/v2/"), "/api/v2");
        assert_eq!(normalize_prefix("/"), "");
    }

    #[test]
    fn test_test_config_suppresses_mail() {
        let config = ApiConfig::for_tests("/tmp/static");
        assert!(config.mail.suppress_send);
        assert_eq!(config.bind_address(), "127.0.0.1:0");
        assert!(!config.uses_dev_secret());
    }
}
