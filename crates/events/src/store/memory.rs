//! [`NotificationStore`] held entirely in memory.
//!
//! Same visibility and monotonic-read semantics as the Postgres store. Used
//! by the API test suite and for running the server without a database.
//! The public knobs at the bottom exist for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use carecircle_core::notification::NotificationContent;
use carecircle_core::preferences::{NotificationPreferences, PreferencesUpdate};
use carecircle_core::types::{DbId, Timestamp};
use carecircle_db::models::notification::{Notification, NotificationFilter};
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::{MarkReadStatus, NotificationStore};

#[derive(Default)]
struct Tables {
    next_id: DbId,
    notifications: Vec<Notification>,
    preferences: HashMap<DbId, NotificationPreferences>,
}

#[derive(Default)]
pub struct InMemoryNotificationStore {
    tables: Mutex<Tables>,
    failing_creates: Mutex<HashSet<DbId>>,
    /// Number of `list_for_user` calls served.
    pub list_calls: AtomicU64,
    /// Number of `mark_read_by_ids` calls served.
    pub mark_by_ids_calls: AtomicU64,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create` for `user_id` fail.
    pub async fn fail_creates_for(&self, user_id: DbId) {
        self.failing_creates.lock().await.insert(user_id);
    }

    /// Every stored row for a user, including expired ones, oldest first.
    pub async fn all_for_user(&self, user_id: DbId) -> Vec<Notification> {
        self.tables
            .lock()
            .await
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Total stored rows, including expired ones.
    pub async fn len(&self) -> usize {
        self.tables.lock().await.notifications.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Overwrite `read_at` of a read notification.
    pub async fn backdate_read(&self, notification_id: DbId, read_at: Timestamp) {
        let mut tables = self.tables.lock().await;
        if let Some(n) = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.is_read)
        {
            n.read_at = Some(read_at);
        }
    }
}

fn mark(n: &mut Notification, now: Timestamp) {
    n.is_read = true;
    n.read_at.get_or_insert(now);
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create(
        &self,
        user_id: DbId,
        content: &NotificationContent,
    ) -> Result<Notification, StoreError> {
        if self.failing_creates.lock().await.contains(&user_id) {
            return Err(StoreError::Unavailable(format!(
                "create rejected for user {user_id}"
            )));
        }

        let mut tables = self.tables.lock().await;
        tables.next_id += 1;
        let notification = Notification {
            id: tables.next_id,
            user_id,
            notification_type: content.notification_type.as_str().to_string(),
            title: content.title.clone(),
            message: content.message.clone(),
            rich_message: content.rich_message.clone(),
            data: Json(content.data.clone()),
            is_actionable: content.is_actionable,
            action_url: content.action_url.clone(),
            cta_label: content.cta_label.clone(),
            secondary_action_url: content.secondary_action_url.clone(),
            secondary_cta_label: content.secondary_cta_label.clone(),
            image_url: content.image_url.clone(),
            thumbnail_url: content.thumbnail_url.clone(),
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
            expires_at: content.expires_at,
        };
        tables.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_for_user(
        &self,
        user_id: DbId,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let tables = self.tables.lock().await;

        let mut rows: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && n.is_visible_at(now))
            .filter(|n| !filter.unread_only || !n.is_read)
            .filter(|n| {
                filter
                    .notification_type
                    .as_deref()
                    .is_none_or(|t| n.notification_type == t)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn mark_read(
        &self,
        user_id: DbId,
        notification_id: DbId,
    ) -> Result<MarkReadStatus, StoreError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let Some(n) = tables.notifications.iter_mut().find(|n| {
            n.id == notification_id && n.user_id == user_id && n.is_visible_at(now)
        }) else {
            return Ok(MarkReadStatus::NotFound);
        };
        let changed = !n.is_read;
        mark(n, now);
        Ok(MarkReadStatus::from_changed(Some(changed)))
    }

    async fn mark_all_read(&self, user_id: DbId) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let mut count = 0;
        for n in tables
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read && n.is_visible_at(now))
        {
            mark(n, now);
            count += 1;
        }
        Ok(count)
    }

    async fn mark_read_by_ids(&self, user_id: DbId, ids: &[DbId]) -> Result<u64, StoreError> {
        self.mark_by_ids_calls.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let mut count = 0;
        for n in tables
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read && ids.contains(&n.id))
        {
            mark(n, now);
            count += 1;
        }
        Ok(count)
    }

    async fn count_unread(&self, user_id: DbId) -> Result<i64, StoreError> {
        let now = Utc::now();
        let tables = self.tables.lock().await;
        let count = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read && n.is_visible_at(now))
            .count();
        Ok(count as i64)
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let before = tables.notifications.len();
        tables.notifications.retain(|n| n.is_visible_at(now));
        Ok((before - tables.notifications.len()) as u64)
    }

    async fn delete_old_read(&self, older_than: Timestamp) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.notifications.len();
        tables
            .notifications
            .retain(|n| !(n.is_read && n.read_at.is_some_and(|at| at < older_than)));
        Ok((before - tables.notifications.len()) as u64)
    }

    async fn get_preferences(
        &self,
        user_id: DbId,
    ) -> Result<Option<NotificationPreferences>, StoreError> {
        Ok(self.tables.lock().await.preferences.get(&user_id).cloned())
    }

    async fn upsert_preferences(
        &self,
        user_id: DbId,
        update: &PreferencesUpdate,
    ) -> Result<NotificationPreferences, StoreError> {
        let mut tables = self.tables.lock().await;
        let prefs = tables
            .preferences
            .entry(user_id)
            .or_insert_with(|| NotificationPreferences::defaults_for(user_id));
        prefs.apply(update);
        Ok(prefs.clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
