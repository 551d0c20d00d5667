//! Repository for the `notifications` table.
//!
//! Every read filters out expired rows, and every read-state update only
//! moves `is_read` forward: `read_at` is set once and never cleared.

use carecircle_core::notification::NotificationContent;
use carecircle_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::notification::{Notification, NotificationFilter};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, user_id, notification_type, title, message, rich_message, data, \
    is_actionable, action_url, cta_label, secondary_action_url, secondary_cta_label, \
    image_url, thumbnail_url, is_read, read_at, created_at, expires_at";

/// Predicate for rows that are still visible.
const VISIBLE: &str = "(expires_at IS NULL OR expires_at > NOW())";

/// Provides CRUD operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a notification for a user, returning the full row.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        content: &NotificationContent,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications \
                (user_id, notification_type, title, message, rich_message, data, \
                 is_actionable, action_url, cta_label, secondary_action_url, \
                 secondary_cta_label, image_url, thumbnail_url, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(content.notification_type.as_str())
            .bind(&content.title)
            .bind(&content.message)
            .bind(&content.rich_message)
            .bind(Json(&content.data))
            .bind(content.is_actionable)
            .bind(&content.action_url)
            .bind(&content.cta_label)
            .bind(&content.secondary_action_url)
            .bind(&content.secondary_cta_label)
            .bind(&content.image_url)
            .bind(&content.thumbnail_url)
            .bind(content.expires_at)
            .fetch_one(pool)
            .await
    }

    /// List a user's visible notifications, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let unread = if filter.unread_only {
            "AND is_read = false"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1 AND {VISIBLE} {unread} \
               AND ($2::text IS NULL OR notification_type = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(&filter.notification_type)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Mark a single notification as read.
    ///
    /// Returns `None` if no visible notification with that id belongs to
    /// `user_id`, otherwise whether this call flipped it from unread. An
    /// already-read notification keeps its `read_at`.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<Option<bool>, sqlx::Error> {
        let query = format!(
            "WITH target AS ( \
                 SELECT id, is_read FROM notifications \
                 WHERE id = $1 AND user_id = $2 AND {VISIBLE} \
                 FOR UPDATE \
             ) \
             UPDATE notifications n \
             SET is_read = true, read_at = COALESCE(n.read_at, NOW()) \
             FROM target \
             WHERE n.id = target.id \
             RETURNING NOT target.is_read"
        );
        sqlx::query_scalar::<_, bool>(&query)
            .bind(notification_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Mark all unread, visible notifications as read for a user.
    ///
    /// Returns the number of notifications that were marked read.
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let query = format!(
            "UPDATE notifications \
             SET is_read = true, read_at = COALESCE(read_at, NOW()) \
             WHERE user_id = $1 AND is_read = false AND {VISIBLE}"
        );
        let result = sqlx::query(&query).bind(user_id).execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Mark exactly the given ids read, restricted to `user_id`'s unread rows.
    pub async fn mark_read_by_ids(
        pool: &PgPool,
        user_id: DbId,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = COALESCE(read_at, NOW()) \
             WHERE user_id = $1 AND id = ANY($2) AND is_read = false",
        )
        .bind(user_id)
        .bind(ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Get the number of unread, visible notifications for a user.
    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM notifications \
             WHERE user_id = $1 AND is_read = false AND {VISIBLE}"
        );
        let count: Option<i64> = sqlx::query_scalar(&query)
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        Ok(count.unwrap_or(0))
    }

    /// Delete every notification whose `expires_at` has passed.
    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE expires_at IS NOT NULL AND expires_at <= NOW()",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete read notifications whose `read_at` is older than `older_than`.
    pub async fn delete_old_read(pool: &PgPool, older_than: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE is_read = true AND read_at < $1",
        )
        .bind(older_than)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
