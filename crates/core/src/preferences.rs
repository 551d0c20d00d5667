//! Per-user delivery preferences: defaults, partial updates, boundary
//! validation, and the `(channel, category)` switch lookup table.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::channels::Channel;
use crate::error::CoreError;
use crate::notification::NotificationType;
use crate::types::DbId;

/// `HH:MM`, 24-hour clock, zero-padded.
static TIME_OF_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A user's delivery preferences.
///
/// Exactly one record per user. A user without a stored row is treated as
/// having [`NotificationPreferences::defaults_for`]; the default is never
/// written implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub user_id: DbId,

    pub email_enabled: bool,
    pub in_app_enabled: bool,

    pub email_messages: bool,
    pub email_care_updates: bool,
    pub email_announcements: bool,
    pub email_family_activity: bool,
    pub email_emergency_alerts: bool,

    pub in_app_messages: bool,
    pub in_app_care_updates: bool,
    pub in_app_announcements: bool,
    pub in_app_family_activity: bool,
    pub in_app_emergency_alerts: bool,

    pub quiet_hours_enabled: bool,
    /// `HH:MM`, local to [`timezone`](Self::timezone).
    pub quiet_hours_start: Option<String>,
    /// `HH:MM`, local to [`timezone`](Self::timezone).
    pub quiet_hours_end: Option<String>,
    /// IANA zone name. `None` means UTC.
    pub timezone: Option<String>,
}

impl NotificationPreferences {
    /// The record a user gets before they ever save preferences.
    ///
    /// Everything is on except family-activity email; quiet hours are off.
    pub fn defaults_for(user_id: DbId) -> Self {
        Self {
            user_id,
            email_enabled: true,
            in_app_enabled: true,
            email_messages: true,
            email_care_updates: true,
            email_announcements: true,
            email_family_activity: false,
            email_emergency_alerts: true,
            in_app_messages: true,
            in_app_care_updates: true,
            in_app_announcements: true,
            in_app_family_activity: true,
            in_app_emergency_alerts: true,
            quiet_hours_enabled: false,
            quiet_hours_start: None,
            quiet_hours_end: None,
            timezone: None,
        }
    }

    /// Master switch for a channel.
    pub fn channel_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::InApp => self.in_app_enabled,
            Channel::Email => self.email_enabled,
        }
    }

    /// Overwrite every field that is `Some` in `update`.
    pub fn apply(&mut self, update: &PreferencesUpdate) {
        set(&mut self.email_enabled, update.email_enabled);
        set(&mut self.in_app_enabled, update.in_app_enabled);
        set(&mut self.email_messages, update.email_messages);
        set(&mut self.email_care_updates, update.email_care_updates);
        set(&mut self.email_announcements, update.email_announcements);
        set(&mut self.email_family_activity, update.email_family_activity);
        set(&mut self.email_emergency_alerts, update.email_emergency_alerts);
        set(&mut self.in_app_messages, update.in_app_messages);
        set(&mut self.in_app_care_updates, update.in_app_care_updates);
        set(&mut self.in_app_announcements, update.in_app_announcements);
        set(&mut self.in_app_family_activity, update.in_app_family_activity);
        set(&mut self.in_app_emergency_alerts, update.in_app_emergency_alerts);
        set(&mut self.quiet_hours_enabled, update.quiet_hours_enabled);

        set_nullable(&mut self.quiet_hours_start, &update.quiet_hours_start);
        set_nullable(&mut self.quiet_hours_end, &update.quiet_hours_end);
        set_nullable(&mut self.timezone, &update.timezone);
    }

    /// A copy of `self` with `update` applied.
    pub fn merged(&self, update: &PreferencesUpdate) -> Self {
        let mut next = self.clone();
        next.apply(update);
        next
    }
}

fn set(target: &mut bool, value: Option<bool>) {
    if let Some(v) = value {
        *target = v;
    }
}

fn set_nullable(target: &mut Option<String>, value: &Option<Option<String>>) {
    if let Some(v) = value {
        target.clone_from(v);
    }
}

/// Partial preference update. Absent fields keep their current value.
///
/// The three nullable fields use `Option<Option<String>>`: an absent key
/// keeps the stored value, an explicit `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub email_enabled: Option<bool>,
    pub in_app_enabled: Option<bool>,
    pub email_messages: Option<bool>,
    pub email_care_updates: Option<bool>,
    pub email_announcements: Option<bool>,
    pub email_family_activity: Option<bool>,
    pub email_emergency_alerts: Option<bool>,
    pub in_app_messages: Option<bool>,
    pub in_app_care_updates: Option<bool>,
    pub in_app_announcements: Option<bool>,
    pub in_app_family_activity: Option<bool>,
    pub in_app_emergency_alerts: Option<bool>,
    pub quiet_hours_enabled: Option<bool>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub quiet_hours_start: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub quiet_hours_end: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub timezone: Option<Option<String>>,
}

/// Deserialize a present key (value or `null`) as `Some`; `#[serde(default)]`
/// covers the absent case.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Boundary validation
// ---------------------------------------------------------------------------

/// Validate a preference update against the state it would produce.
///
/// Called by the HTTP layer before the upsert; the resolver and the store
/// perform no cross-field validation of their own.
///
/// - Supplied `quietHoursStart` / `quietHoursEnd` must be `HH:MM` or `null`.
/// - A supplied `timezone` must be a known IANA zone or `null` (UTC).
/// - If the merged state has quiet hours enabled, both bounds must be
///   present in the merged state.
pub fn validate_update(
    update: &PreferencesUpdate,
    merged: &NotificationPreferences,
) -> Result<(), CoreError> {
    for (name, value) in [
        ("quietHoursStart", &update.quiet_hours_start),
        ("quietHoursEnd", &update.quiet_hours_end),
    ] {
        if let Some(Some(v)) = value {
            if !TIME_OF_DAY_RE.is_match(v) {
                return Err(CoreError::Validation(format!(
                    "{name} must be in HH:MM 24-hour format (got '{v}')"
                )));
            }
        }
    }

    if let Some(Some(tz)) = &update.timezone {
        if tz.parse::<chrono_tz::Tz>().is_err() {
            return Err(CoreError::Validation(format!("Unknown timezone: '{tz}'")));
        }
    }

    if merged.quiet_hours_enabled
        && (merged.quiet_hours_start.is_none() || merged.quiet_hours_end.is_none())
    {
        return Err(CoreError::Validation(
            "quietHoursStart and quietHoursEnd are required when quietHoursEnabled is true"
                .to_string(),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// (channel, category) lookup table
// ---------------------------------------------------------------------------

/// Notification categories that carry per-channel preference switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceCategory {
    Messages,
    CareUpdates,
    Announcements,
    FamilyActivity,
    EmergencyAlerts,
}

impl PreferenceCategory {
    /// The category governing `notification_type`, if it has one.
    pub fn of(notification_type: &NotificationType) -> Option<Self> {
        match notification_type {
            NotificationType::Message => Some(Self::Messages),
            NotificationType::CareUpdate => Some(Self::CareUpdates),
            NotificationType::SystemAnnouncement => Some(Self::Announcements),
            NotificationType::FamilyActivity => Some(Self::FamilyActivity),
            NotificationType::EmergencyAlert => Some(Self::EmergencyAlerts),
            NotificationType::Other(_) => None,
        }
    }
}

type FlagAccessor = fn(&NotificationPreferences) -> bool;

/// One row per `(channel, category)` pair.
static PREFERENCE_FLAGS: [(Channel, PreferenceCategory, FlagAccessor); 10] = [
    (Channel::Email, PreferenceCategory::Messages, |p| p.email_messages),
    (Channel::Email, PreferenceCategory::CareUpdates, |p| p.email_care_updates),
    (Channel::Email, PreferenceCategory::Announcements, |p| p.email_announcements),
    (Channel::Email, PreferenceCategory::FamilyActivity, |p| p.email_family_activity),
    (Channel::Email, PreferenceCategory::EmergencyAlerts, |p| p.email_emergency_alerts),
    (Channel::InApp, PreferenceCategory::Messages, |p| p.in_app_messages),
    (Channel::InApp, PreferenceCategory::CareUpdates, |p| p.in_app_care_updates),
    (Channel::InApp, PreferenceCategory::Announcements, |p| p.in_app_announcements),
    (Channel::InApp, PreferenceCategory::FamilyActivity, |p| p.in_app_family_activity),
    (Channel::InApp, PreferenceCategory::EmergencyAlerts, |p| p.in_app_emergency_alerts),
];

/// The per-type switch for `(channel, notification_type)`.
///
/// Returns `None` when the type has no switch; callers treat that as allowed.
pub fn type_flag(
    prefs: &NotificationPreferences,
    channel: Channel,
    notification_type: &NotificationType,
) -> Option<bool> {
    let category = PreferenceCategory::of(notification_type)?;
    PREFERENCE_FLAGS
        .iter()
        .find(|(c, k, _)| *c == channel && *k == category)
        .map(|(_, _, accessor)| accessor(prefs))
}
