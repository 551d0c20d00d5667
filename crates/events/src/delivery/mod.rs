//! Delivery capabilities and message rendering.
//!
//! - [`Broadcaster`] pushes a live unread count to a user's sessions.
//! - [`EmailSender`] hands a rendered message to a mail transport.
//! - [`email::SmtpEmailSender`] is the lettre-backed transport.

pub mod email;

use std::collections::BTreeMap;

use async_trait::async_trait;
use carecircle_core::notification::NotificationContent;
use carecircle_core::types::DbId;

use crate::error::DeliveryChannelError;
use crate::store::NotificationStore;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Push `count` to every live session of `user_id`. Having no live
    /// session is not an error.
    async fn push_unread_count(&self, user_id: DbId, count: i64)
        -> Result<(), DeliveryChannelError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Correlation fields (notification id, type, recipient). Transports may
    /// attach them as headers or ignore them.
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailReceipt {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<EmailReceipt, DeliveryChannelError>;
}

/// Recount a user's unread notifications and push the total.
///
/// Returns the pushed count. A failed recount is reported as a broadcast
/// failure since nothing was pushed.
pub async fn refresh_unread_count(
    store: &dyn NotificationStore,
    broadcaster: &dyn Broadcaster,
    user_id: DbId,
) -> Result<i64, DeliveryChannelError> {
    let count = store
        .count_unread(user_id)
        .await
        .map_err(|e| DeliveryChannelError::Broadcast(format!("unread recount failed: {e}")))?;
    broadcaster.push_unread_count(user_id, count).await?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Display names used when rendering a notification for one recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryContext {
    pub recipient_email: Option<String>,
    pub recipient_name: Option<String>,
    pub sender_name: Option<String>,
    pub family_name: Option<String>,
}

impl DeliveryContext {
    pub fn with_sender(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    pub fn with_family(mut self, name: impl Into<String>) -> Self {
        self.family_name = Some(name.into());
        self
    }
}

/// The sender-side half of a [`DeliveryContext`], shared by every
/// recipient of a fanout. Recipient address and name always come from the
/// user directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderContext {
    pub sender_name: Option<String>,
    pub family_name: Option<String>,
}

impl SenderContext {
    pub fn with_sender(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    pub fn with_family(mut self, name: impl Into<String>) -> Self {
        self.family_name = Some(name.into());
        self
    }
}

impl From<&SenderContext> for DeliveryContext {
    fn from(sender: &SenderContext) -> Self {
        Self {
            recipient_email: None,
            recipient_name: None,
            sender_name: sender.sender_name.clone(),
            family_name: sender.family_name.clone(),
        }
    }
}

/// Render the subject and plain-text body of a notification email.
pub fn render_email(
    content: &NotificationContent,
    context: &DeliveryContext,
    subject_prefix: &str,
) -> (String, String) {
    let subject = if subject_prefix.is_empty() {
        content.title.clone()
    } else {
        format!("{subject_prefix} {}", content.title)
    };

    let greeting = context.recipient_name.as_deref().unwrap_or("there");
    let mut body = format!("Hi {greeting},\n\n{}\n", content.message);

    match (&context.sender_name, &context.family_name) {
        (Some(sender), Some(family)) => {
            body.push_str(&format!("\nFrom {sender} in {family}.\n"));
        }
        (Some(sender), None) => body.push_str(&format!("\nFrom {sender}.\n")),
        (None, Some(family)) => body.push_str(&format!("\nFamily: {family}.\n")),
        (None, None) => {}
    }

    if let Some(url) = &content.action_url {
        let label = content.cta_label.as_deref().unwrap_or("View");
        body.push_str(&format!("\n{label}: {url}\n"));
    }
    if let Some(url) = &content.secondary_action_url {
        let label = content.secondary_cta_label.as_deref().unwrap_or("More");
        body.push_str(&format!("{label}: {url}\n"));
    }

    (subject, body)
}
