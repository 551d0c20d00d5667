//! Persist, gate, and deliver.
//!
//! A dispatch always leaves exactly one stored notification behind once the
//! store accepts it. Channel side effects run afterwards, each under its
//! own deadline; their failures are recorded in [`DispatchResult`] and
//! logged, never propagated.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use carecircle_core::channels::Channel;
use carecircle_core::error::CoreError;
use carecircle_core::notification::NotificationContent;
use carecircle_core::preferences::NotificationPreferences;
use carecircle_core::types::DbId;
use carecircle_db::models::notification::Notification;
use futures::stream::{self, StreamExt};

use crate::config::NotificationConfig;
use crate::decision::{Clock, Decision, DeliveryDecisionEngine, SuppressReason};
use crate::delivery::{
    refresh_unread_count, render_email, Broadcaster, DeliveryContext, EmailSender, OutboundEmail,
};
use crate::directory::{ForumDirectory, UserContact, UserDirectory};
use crate::error::{DeliveryChannelError, NotifyError};
use crate::fanout::{EventFanoutPlanner, FanoutEvent, RecipientRole};
use crate::preferences::PreferenceResolver;
use crate::store::NotificationStore;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What happened on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    Delivered { message_id: Option<String> },
    Suppressed(SuppressReason),
    Failed(DeliveryChannelError),
}

impl ChannelOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ChannelOutcome::Delivered { .. })
    }
}

#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub notification_id: DbId,
    pub user_id: DbId,
    pub in_app: ChannelOutcome,
    pub email: ChannelOutcome,
}

impl DispatchResult {
    pub fn outcome(&self, channel: Channel) -> &ChannelOutcome {
        match channel {
            Channel::InApp => &self.in_app,
            Channel::Email => &self.email,
        }
    }
}

/// One recipient's result within a fanout.
#[derive(Debug)]
pub struct FanoutDelivery {
    pub recipient_id: DbId,
    pub role: RecipientRole,
    pub result: Result<DispatchResult, NotifyError>,
}

// ---------------------------------------------------------------------------
// NotificationDispatcher
// ---------------------------------------------------------------------------

pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    users: Arc<dyn UserDirectory>,
    decisions: DeliveryDecisionEngine,
    planner: EventFanoutPlanner,
    broadcaster: Arc<dyn Broadcaster>,
    email: Option<Arc<dyn EmailSender>>,
    subject_prefix: String,
    channel_timeout: Duration,
    fanout_concurrency: usize,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        users: Arc<dyn UserDirectory>,
        forums: Arc<dyn ForumDirectory>,
        broadcaster: Arc<dyn Broadcaster>,
        config: &NotificationConfig,
    ) -> Self {
        let config = config.clone().normalized();
        Self {
            decisions: DeliveryDecisionEngine::new(PreferenceResolver::new(Arc::clone(&store))),
            store,
            users,
            planner: EventFanoutPlanner::new(forums),
            broadcaster,
            email: None,
            subject_prefix: String::new(),
            channel_timeout: config.channel_timeout,
            fanout_concurrency: config.fanout_concurrency,
        }
    }

    /// Enable the email channel.
    pub fn with_email_sender(
        mut self,
        sender: Arc<dyn EmailSender>,
        subject_prefix: impl Into<String>,
    ) -> Self {
        self.email = Some(sender);
        self.subject_prefix = subject_prefix.into();
        self
    }

    /// Evaluate quiet hours against `clock` instead of the wall clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.decisions = self.decisions.with_clock(clock);
        self
    }

    /// Persist `content` for `user_id`, then deliver it on every channel the
    /// caller requested and the user's preferences allow.
    ///
    /// Errors only if the recipient is unknown (nothing is written) or the
    /// store rejects the notification.
    pub async fn dispatch(
        &self,
        user_id: DbId,
        content: &NotificationContent,
        context: &DeliveryContext,
    ) -> Result<DispatchResult, NotifyError> {
        let contact = self.users.contact(user_id).await?.ok_or(CoreError::NotFound {
            entity: "User",
            id: user_id,
        })?;
        let context = enrich(context, &contact);

        let notification = self.store.create(user_id, content).await?;
        tracing::debug!(
            user_id,
            notification_id = notification.id,
            notification_type = %content.notification_type,
            "Notification persisted"
        );

        let prefs = match self.decisions.resolver().get(user_id).await {
            Ok(prefs) => Some(prefs),
            Err(e) => {
                tracing::error!(
                    user_id,
                    notification_id = notification.id,
                    error = %e,
                    "Failed to load preferences, skipping delivery channels"
                );
                None
            }
        };

        let in_app = self.deliver_in_app(content, prefs.as_ref(), user_id).await;
        let email = self
            .deliver_email(&notification, content, prefs.as_ref(), &context)
            .await;

        Ok(DispatchResult {
            notification_id: notification.id,
            user_id,
            in_app,
            email,
        })
    }

    /// Plan `event` and dispatch to every recipient with bounded
    /// parallelism. One recipient's failure does not affect the others.
    pub async fn dispatch_fanout(&self, event: &FanoutEvent) -> Vec<FanoutDelivery> {
        let planned = self.planner.plan(event).await;
        tracing::debug!(
            event_type = %event.event_type,
            recipients = planned.len(),
            "Fanout planned"
        );

        let context = DeliveryContext::from(&event.sender);
        let context = &context;

        stream::iter(planned)
            .map(|plan| async move {
                let result = self
                    .dispatch(plan.recipient_id, &plan.content, context)
                    .await;
                if let Err(e) = &result {
                    tracing::error!(
                        event_type = %event.event_type,
                        user_id = plan.recipient_id,
                        role = %plan.role,
                        error = %e,
                        "Fanout dispatch failed"
                    );
                }
                FanoutDelivery {
                    recipient_id: plan.recipient_id,
                    role: plan.role,
                    result,
                }
            })
            .buffer_unordered(self.fanout_concurrency)
            .collect()
            .await
    }

    // -- channels ----------------------------------------------------------

    fn gate(
        &self,
        content: &NotificationContent,
        prefs: Option<&NotificationPreferences>,
        channel: Channel,
    ) -> Decision {
        if !content.channels.contains(channel) {
            return Decision::Suppress(SuppressReason::NotRequested);
        }
        match prefs {
            Some(prefs) => self
                .decisions
                .evaluate_now(prefs, &content.notification_type, channel),
            None => Decision::Suppress(SuppressReason::PreferencesUnavailable),
        }
    }

    async fn deliver_in_app(
        &self,
        content: &NotificationContent,
        prefs: Option<&NotificationPreferences>,
        user_id: DbId,
    ) -> ChannelOutcome {
        if let Decision::Suppress(reason) = self.gate(content, prefs, Channel::InApp) {
            return ChannelOutcome::Suppressed(reason);
        }

        let push = refresh_unread_count(self.store.as_ref(), self.broadcaster.as_ref(), user_id);
        match self.with_deadline(Channel::InApp, push).await {
            Ok(_) => ChannelOutcome::Delivered { message_id: None },
            Err(e) => {
                tracing::warn!(user_id, channel = %Channel::InApp, error = %e, "In-app delivery failed");
                ChannelOutcome::Failed(e)
            }
        }
    }

    async fn deliver_email(
        &self,
        notification: &Notification,
        content: &NotificationContent,
        prefs: Option<&NotificationPreferences>,
        context: &DeliveryContext,
    ) -> ChannelOutcome {
        if let Decision::Suppress(reason) = self.gate(content, prefs, Channel::Email) {
            return ChannelOutcome::Suppressed(reason);
        }
        let Some(sender) = &self.email else {
            return ChannelOutcome::Suppressed(SuppressReason::NoTransport);
        };
        let Some(to) = context.recipient_email.clone() else {
            return ChannelOutcome::Suppressed(SuppressReason::NoAddress);
        };

        let (subject, body) = render_email(content, context, &self.subject_prefix);
        let email = OutboundEmail {
            to,
            subject,
            body,
            metadata: BTreeMap::from([
                ("notification_id".to_string(), notification.id.to_string()),
                ("notification_type".to_string(), notification.notification_type.clone()),
                ("user_id".to_string(), notification.user_id.to_string()),
            ]),
        };

        match self.with_deadline(Channel::Email, sender.send(&email)).await {
            Ok(receipt) => ChannelOutcome::Delivered {
                message_id: receipt.message_id,
            },
            Err(e) => {
                tracing::warn!(
                    user_id = notification.user_id,
                    notification_id = notification.id,
                    channel = %Channel::Email,
                    error = %e,
                    "Email delivery failed"
                );
                ChannelOutcome::Failed(e)
            }
        }
    }

    async fn with_deadline<T>(
        &self,
        channel: Channel,
        fut: impl Future<Output = Result<T, DeliveryChannelError>>,
    ) -> Result<T, DeliveryChannelError> {
        tokio::time::timeout(self.channel_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(DeliveryChannelError::Timeout {
                    channel,
                    elapsed_ms: self.channel_timeout.as_millis() as u64,
                })
            })
    }
}

/// Fill recipient fields the caller left empty from the directory entry.
fn enrich(context: &DeliveryContext, contact: &UserContact) -> DeliveryContext {
    let mut context = context.clone();
    if context.recipient_email.is_none() {
        context.recipient_email = contact.email.clone();
    }
    if context.recipient_name.is_none() {
        context.recipient_name = Some(contact.display_name.clone());
    }
    context
}
