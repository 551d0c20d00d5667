//! The persistence seam of the engine.
//!
//! Every implementation must honour two rules: reads never return a
//! notification whose `expires_at` has passed, and read-state updates only
//! move forward (`read_at` is set once and never cleared). Those two rules
//! make concurrent mark-read calls for the same user converge.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use carecircle_core::notification::NotificationContent;
use carecircle_core::preferences::{NotificationPreferences, PreferencesUpdate};
use carecircle_core::types::{DbId, Timestamp};
use carecircle_db::models::notification::{Notification, NotificationFilter};

use crate::error::StoreError;

/// Result of marking a single notification read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkReadStatus {
    /// No visible notification with that id belongs to the user.
    NotFound,
    AlreadyRead,
    /// The notification was unread and is now read.
    Marked,
}

impl MarkReadStatus {
    /// `None` means not found; `Some(changed)` otherwise.
    pub fn from_changed(changed: Option<bool>) -> Self {
        match changed {
            None => MarkReadStatus::NotFound,
            Some(false) => MarkReadStatus::AlreadyRead,
            Some(true) => MarkReadStatus::Marked,
        }
    }

    pub fn is_found(self) -> bool {
        self != MarkReadStatus::NotFound
    }
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a new, unread notification for `user_id`.
    async fn create(
        &self,
        user_id: DbId,
        content: &NotificationContent,
    ) -> Result<Notification, StoreError>;

    /// Visible notifications for a user, newest first.
    async fn list_for_user(
        &self,
        user_id: DbId,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Mark one notification read. Idempotent; repeating the call reports
    /// [`MarkReadStatus::AlreadyRead`].
    async fn mark_read(
        &self,
        user_id: DbId,
        notification_id: DbId,
    ) -> Result<MarkReadStatus, StoreError>;

    async fn mark_all_read(&self, user_id: DbId) -> Result<u64, StoreError>;

    /// Mark exactly `ids` read, restricted to `user_id`'s unread rows.
    async fn mark_read_by_ids(&self, user_id: DbId, ids: &[DbId]) -> Result<u64, StoreError>;

    async fn count_unread(&self, user_id: DbId) -> Result<i64, StoreError>;

    async fn delete_expired(&self) -> Result<u64, StoreError>;

    /// Delete read notifications whose `read_at` is before `older_than`.
    async fn delete_old_read(&self, older_than: Timestamp) -> Result<u64, StoreError>;

    async fn get_preferences(
        &self,
        user_id: DbId,
    ) -> Result<Option<NotificationPreferences>, StoreError>;

    /// Merge `update` into the stored row, creating it from defaults first
    /// if absent.
    async fn upsert_preferences(
        &self,
        user_id: DbId,
        update: &PreferencesUpdate,
    ) -> Result<NotificationPreferences, StoreError>;

    /// Liveness probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
