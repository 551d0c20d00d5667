//! Per-channel delivery gating.
//!
//! Quiet hours gate the email channel only. In-app delivery (the live badge
//! count) is never held back by quiet hours; this is a fixed policy, not a
//! per-call option.

use carecircle_core::channels::Channel;
use carecircle_core::notification::NotificationType;
use carecircle_core::preferences::{type_flag, NotificationPreferences};
use carecircle_core::quiet_hours;
use std::fmt;
use std::sync::Arc;

use carecircle_core::types::{DbId, Timestamp};
use chrono::Utc;
use serde::Serialize;

use crate::error::StoreError;
use crate::preferences::PreferenceResolver;

/// Why a channel was not used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    /// The caller did not ask for this channel.
    NotRequested,
    /// The user's master switch for the channel is off.
    ChannelDisabled,
    /// The user's per-type switch for the channel is off.
    TypeDisabled,
    /// Email inside the user's quiet window.
    QuietHours,
    /// The recipient has no email address.
    NoAddress,
    /// No email transport is configured.
    NoTransport,
    /// Preferences could not be loaded after the notification was saved.
    PreferencesUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Suppress(SuppressReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decide a single `(preferences, type, channel)` tuple at `now`.
///
/// Master switch first, then the per-type switch (types without one are
/// allowed), then quiet hours for email.
pub fn evaluate(
    prefs: &NotificationPreferences,
    notification_type: &NotificationType,
    channel: Channel,
    now: Timestamp,
) -> Decision {
    if !prefs.channel_enabled(channel) {
        return Decision::Suppress(SuppressReason::ChannelDisabled);
    }
    if type_flag(prefs, channel, notification_type) == Some(false) {
        return Decision::Suppress(SuppressReason::TypeDisabled);
    }
    if channel == Channel::Email && quiet_hours::is_quiet(prefs, now) {
        return Decision::Suppress(SuppressReason::QuietHours);
    }
    Decision::Allow
}

/// Source of "now" for quiet-hours checks.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Preference lookup plus [`evaluate`] against an injectable clock.
#[derive(Clone)]
pub struct DeliveryDecisionEngine {
    resolver: PreferenceResolver,
    clock: Clock,
}

impl fmt::Debug for DeliveryDecisionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryDecisionEngine").finish_non_exhaustive()
    }
}

impl DeliveryDecisionEngine {
    pub fn new(resolver: PreferenceResolver) -> Self {
        Self {
            resolver,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock, e.g. with a fixed instant in tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn resolver(&self) -> &PreferenceResolver {
        &self.resolver
    }

    pub fn now(&self) -> Timestamp {
        (self.clock)()
    }

    /// [`evaluate`] at the engine's current time.
    pub fn evaluate_now(
        &self,
        prefs: &NotificationPreferences,
        notification_type: &NotificationType,
        channel: Channel,
    ) -> Decision {
        evaluate(prefs, notification_type, channel, self.now())
    }

    /// Whether `user_id` should receive `notification_type` on `channel` now.
    pub async fn should_deliver(
        &self,
        user_id: DbId,
        notification_type: &NotificationType,
        channel: Channel,
    ) -> Result<bool, StoreError> {
        Ok(self
            .decide(user_id, notification_type, channel, self.now())
            .await?
            .is_allowed())
    }

    pub async fn decide(
        &self,
        user_id: DbId,
        notification_type: &NotificationType,
        channel: Channel,
        now: Timestamp,
    ) -> Result<Decision, StoreError> {
        let prefs = self.resolver.get(user_id).await?;
        Ok(evaluate(&prefs, notification_type, channel, now))
    }
}
