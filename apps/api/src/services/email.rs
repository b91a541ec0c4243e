//! Email service for order confirmations and password resets.
//!
//! Uses SMTP via lettre for delivery. With sending suppressed, messages are
//! logged and kept in an in-memory outbox instead.
//!
//! Sending never blocks a request: handlers call [`spawn_send`] after their
//! transaction committed, and a failed delivery is only logged.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::{authentication::Credentials, Error as SmtpError};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use tavola_core::{Address, OrderDetails, User};

use crate::config::MailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Missing mail configuration: {0}")]
    NotConfigured(&'static str),
}

/// A plain-text message ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError>;
}

// =============================================================================
// SMTP
// =============================================================================

/// Delivers mail through an SMTP relay with STARTTLS.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, EmailError> {
        let server = config
            .server
            .as_deref()
            .ok_or(EmailError::NotConfigured("MAIL_SERVER"))?;
        let from = config
            .from
            .as_deref()
            .ok_or(EmailError::NotConfigured("MAIL_FROM"))?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)?.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(SmtpMailer {
            transport: builder.build(),
            from: from
                .parse()
                .map_err(|_| EmailError::InvalidAddress(from.to_string()))?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(email.to.clone()))?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)?;

        self.transport.send(message).await?;

        info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

// =============================================================================
// Suppressed
// =============================================================================

/// Logs messages instead of sending them and keeps them for inspection.
#[derive(Default)]
pub struct LogMailer {
    outbox: Mutex<Vec<OutgoingEmail>>,
}

impl LogMailer {
    pub fn new() -> Self {
        LogMailer::default()
    }

    /// Messages "sent" so far, oldest first.
    pub async fn outbox(&self) -> Vec<OutgoingEmail> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        info!(to = %email.to, subject = %email.subject, "Email suppressed");
        self.outbox.lock().await.push(email);
        Ok(())
    }
}

/// Picks the mailer for the configuration.
pub fn mailer_from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, EmailError> {
    if config.suppress_send {
        Ok(Arc::new(LogMailer::new()))
    } else {
        Ok(Arc::new(SmtpMailer::new(config)?))
    }
}

/// Sends in the background. Failures are logged, never retried.
pub fn spawn_send(mailer: Arc<dyn Mailer>, email: OutgoingEmail) {
    tokio::spawn(async move {
        let to = email.to.clone();
        let subject = email.subject.clone();
        if let Err(e) = mailer.send(email).await {
            warn!(error = %e, to = %to, subject = %subject, "Failed to send email");
        }
    });
}

// =============================================================================
// Messages
// =============================================================================

pub fn order_confirmation(user: &User, order: &OrderDetails, address: &Address) -> OutgoingEmail {
    let mut body = format!(
        "Hello {},\n\nThank you for your order #{}.\n\n",
        user.first_name, order.order.id
    );

    for item in &order.order_items {
        body.push_str(&format!(
            "  product #{} x{} @ {} = {}\n",
            item.product_id,
            item.quantity,
            item.product_price(),
            item.line_total()
                .map_or_else(|_| "-".to_string(), |total| total.to_string())
        ));
    }

    body.push_str(&format!(
        "\nTotal: {}\nDelivery address: {}\n",
        order.total_price,
        address.full_address()
    ));

    if let Some(comments) = &order.order.comments {
        body.push_str(&format!("Comments: {}\n", comments));
    }

    OutgoingEmail {
        to: user.email.clone(),
        subject: "Order Confirmation.".to_string(),
        body,
    }
}

pub fn password_reset(user: &User, token: &str, lifetime_secs: i64) -> OutgoingEmail {
    OutgoingEmail {
        to: user.email.clone(),
        subject: "Password Reset.".to_string(),
        body: format!(
            "Hello {},\n\nUse this token to reset your password:\n\n{}\n\n\
             It expires in {} minutes. If you did not ask for a reset, ignore this email.\n",
            user.first_name,
            token,
            (lifetime_secs + 59) / 60
        ),
    }
}
