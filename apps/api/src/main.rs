//! # Tavola API
//!
//! REST server for the restaurant backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tavola API Server                                │
//! │                                                                         │
//! │  Client ───► HTTP (8080) ───► Routes ───► Services ───► SQLite         │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │                            SMTP (lettre)                                │
//! │                          static/pictures                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tavola_api::services::email::mailer_from_config;
use tavola_api::{build_router, ApiConfig, AppState};
use tavola_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tavola_api=info,tower_http=info")),
        )
        .with_target(true)
        .init();

    info!("Starting Tavola API server...");

    // Load configuration
    let config = ApiConfig::load().context("Failed to load configuration")?;
    info!(
        port = config.port,
        prefix = %config.api_prefix,
        db_url = %config.database_url,
        "Configuration loaded"
    );

    if config.uses_dev_secret() {
        warn!("JWT_SECRET is not set; using the development secret");
    }
    if config.mail.suppress_send {
        info!("Mail sending is suppressed; messages are only logged");
    }

    // Connect to database (migrations run on connect)
    let db = Database::new(
        DbConfig::from_url(&config.database_url).max_connections(config.database_max_connections),
    )
    .await
    .context("Failed to open database")?;
    info!("Database ready");

    let mailer = mailer_from_config(&config.mail).context("Failed to configure mailer")?;

    let addr = config.bind_address();
    let state = Arc::new(AppState::new(db.clone(), config, mailer));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
