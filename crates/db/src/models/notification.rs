//! Notification entity models and DTOs.

use carecircle_core::notification::{NotificationData, NotificationType};
use carecircle_core::preferences::NotificationPreferences;
use carecircle_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub rich_message: Option<String>,
    pub data: Json<NotificationData>,
    pub is_actionable: bool,
    pub action_url: Option<String>,
    pub cta_label: Option<String>,
    pub secondary_action_url: Option<String>,
    pub secondary_cta_label: Option<String>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl Notification {
    /// Parsed category of this notification.
    pub fn kind(&self) -> NotificationType {
        NotificationType::parse(&self.notification_type)
    }

    /// Visible to queries while unexpired.
    pub fn is_visible_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Filters for listing a user's notifications.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    /// Only return notifications with `is_read = false`.
    pub unread_only: bool,
    /// Only return notifications of this wire type (e.g. `"CARE_UPDATE"`).
    pub notification_type: Option<String>,
}

/// A row from the `notification_preferences` table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationPreferenceRow {
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
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
    pub timezone: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<NotificationPreferenceRow> for NotificationPreferences {
    fn from(row: NotificationPreferenceRow) -> Self {
        Self {
            user_id: row.user_id,
            email_enabled: row.email_enabled,
            in_app_enabled: row.in_app_enabled,
            email_messages: row.email_messages,
            email_care_updates: row.email_care_updates,
            email_announcements: row.email_announcements,
            email_family_activity: row.email_family_activity,
            email_emergency_alerts: row.email_emergency_alerts,
            in_app_messages: row.in_app_messages,
            in_app_care_updates: row.in_app_care_updates,
            in_app_announcements: row.in_app_announcements,
            in_app_family_activity: row.in_app_family_activity,
            in_app_emergency_alerts: row.in_app_emergency_alerts,
            quiet_hours_enabled: row.quiet_hours_enabled,
            quiet_hours_start: row.quiet_hours_start,
            quiet_hours_end: row.quiet_hours_end,
            timezone: row.timezone,
        }
    }
}
