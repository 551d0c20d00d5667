//! Email delivery via SMTP.
//!
//! [`SmtpEmailSender`] wraps the `lettre` async SMTP transport. If
//! `SMTP_HOST` is not set, [`EmailConfig::from_env`] returns `None` and the
//! dispatcher runs without an email transport.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::delivery::{EmailReceipt, EmailSender, OutboundEmail};
use crate::error::DeliveryChannelError;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),
}

impl From<EmailError> for DeliveryChannelError {
    fn from(err: EmailError) -> Self {
        DeliveryChannelError::Email(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

const DEFAULT_FROM_ADDRESS: &str = "noreply@carecircle.local";

const DEFAULT_SUBJECT_PREFIX: &str = "[CareCircle]";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// Prepended to every subject line.
    pub subject_prefix: String,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set.
    ///
    /// | Variable               | Required | Default                    |
    /// |------------------------|----------|----------------------------|
    /// | `SMTP_HOST`            | yes      | -                          |
    /// | `SMTP_PORT`            | no       | `587`                      |
    /// | `SMTP_FROM`            | no       | `noreply@carecircle.local` |
    /// | `SMTP_USER`            | no       | -                          |
    /// | `SMTP_PASSWORD`        | no       | -                          |
    /// | `EMAIL_SUBJECT_PREFIX` | no       | `[CareCircle]`             |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            subject_prefix: std::env::var("EMAIL_SUBJECT_PREFIX")
                .unwrap_or_else(|_| DEFAULT_SUBJECT_PREFIX.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// SmtpEmailSender
// ---------------------------------------------------------------------------

pub struct SmtpEmailSender {
    from: lettre::message::Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailSender {
    /// Build the transport. No connection is opened until the first send.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            from: config.from_address.parse()?,
            mailer: builder.build(),
        })
    }

    fn build_message(&self, email: &OutboundEmail) -> Result<Message, EmailError> {
        Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, email: &OutboundEmail) -> Result<EmailReceipt, DeliveryChannelError> {
        let message = self.build_message(email)?;
        let response = self.mailer.send(message).await.map_err(EmailError::from)?;

        let message_id = response.first_line().map(str::to_string);
        tracing::info!(
            to = %email.to,
            notification_id = email.metadata.get("notification_id").map(String::as_str),
            "Notification email sent"
        );
        Ok(EmailReceipt { message_id })
    }
}
