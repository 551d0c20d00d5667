//! Repository for the `notification_preferences` table.

use carecircle_core::preferences::PreferencesUpdate;
use carecircle_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification::NotificationPreferenceRow;

/// Column list for `notification_preferences` queries.
const COLUMNS: &str = "user_id, email_enabled, in_app_enabled, \
    email_messages, email_care_updates, email_announcements, email_family_activity, \
    email_emergency_alerts, in_app_messages, in_app_care_updates, in_app_announcements, \
    in_app_family_activity, in_app_emergency_alerts, quiet_hours_enabled, \
    quiet_hours_start, quiet_hours_end, timezone, created_at, updated_at";

/// Provides read and upsert operations for per-user delivery preferences.
pub struct NotificationPreferenceRepo;

impl NotificationPreferenceRepo {
    /// Get the stored preferences for a user, if any.
    pub async fn get(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<NotificationPreferenceRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_preferences WHERE user_id = $1");
        sqlx::query_as::<_, NotificationPreferenceRow>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or partially update a user's preferences.
    ///
    /// A missing row is first created from the column defaults (which mirror
    /// `NotificationPreferences::defaults_for`), then every field that is
    /// `Some` in `update` is written with `COALESCE`. The nullable text
    /// columns use a "provided" flag so an explicit `null` clears them. Both
    /// statements run in one transaction.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        update: &PreferencesUpdate,
    ) -> Result<NotificationPreferenceRow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO notification_preferences (user_id) VALUES ($1) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "UPDATE notification_preferences SET \
                email_enabled = COALESCE($2, email_enabled), \
                in_app_enabled = COALESCE($3, in_app_enabled), \
                email_messages = COALESCE($4, email_messages), \
                email_care_updates = COALESCE($5, email_care_updates), \
                email_announcements = COALESCE($6, email_announcements), \
                email_family_activity = COALESCE($7, email_family_activity), \
                email_emergency_alerts = COALESCE($8, email_emergency_alerts), \
                in_app_messages = COALESCE($9, in_app_messages), \
                in_app_care_updates = COALESCE($10, in_app_care_updates), \
                in_app_announcements = COALESCE($11, in_app_announcements), \
                in_app_family_activity = COALESCE($12, in_app_family_activity), \
                in_app_emergency_alerts = COALESCE($13, in_app_emergency_alerts), \
                quiet_hours_enabled = COALESCE($14, quiet_hours_enabled), \
                quiet_hours_start = CASE WHEN $15 THEN $16 ELSE quiet_hours_start END, \
                quiet_hours_end = CASE WHEN $17 THEN $18 ELSE quiet_hours_end END, \
                timezone = CASE WHEN $19 THEN $20 ELSE timezone END, \
                updated_at = NOW() \
             WHERE user_id = $1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, NotificationPreferenceRow>(&query)
            .bind(user_id)
            .bind(update.email_enabled)
            .bind(update.in_app_enabled)
            .bind(update.email_messages)
            .bind(update.email_care_updates)
            .bind(update.email_announcements)
            .bind(update.email_family_activity)
            .bind(update.email_emergency_alerts)
            .bind(update.in_app_messages)
            .bind(update.in_app_care_updates)
            .bind(update.in_app_announcements)
            .bind(update.in_app_family_activity)
            .bind(update.in_app_emergency_alerts)
            .bind(update.quiet_hours_enabled)
            .bind(update.quiet_hours_start.is_some())
            .bind(update.quiet_hours_start.as_ref().and_then(|v| v.as_deref()))
            .bind(update.quiet_hours_end.is_some())
            .bind(update.quiet_hours_end.as_ref().and_then(|v| v.as_deref()))
            .bind(update.timezone.is_some())
            .bind(update.timezone.as_ref().and_then(|v| v.as_deref()))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }
}
