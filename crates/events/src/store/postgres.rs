//! [`NotificationStore`] backed by PostgreSQL.

use async_trait::async_trait;
use carecircle_core::notification::NotificationContent;
use carecircle_core::preferences::{NotificationPreferences, PreferencesUpdate};
use carecircle_core::types::{DbId, Timestamp};
use carecircle_db::models::notification::{Notification, NotificationFilter};
use carecircle_db::repositories::{NotificationPreferenceRepo, NotificationRepo};
use carecircle_db::DbPool;

use crate::error::StoreError;
use crate::store::{MarkReadStatus, NotificationStore};

pub struct PgNotificationStore {
    pool: DbPool,
}

impl PgNotificationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(
        &self,
        user_id: DbId,
        content: &NotificationContent,
    ) -> Result<Notification, StoreError> {
        Ok(NotificationRepo::create(&self.pool, user_id, content).await?)
    }

    async fn list_for_user(
        &self,
        user_id: DbId,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        Ok(NotificationRepo::list_for_user(&self.pool, user_id, filter, limit, offset).await?)
    }

    async fn mark_read(
        &self,
        user_id: DbId,
        notification_id: DbId,
    ) -> Result<MarkReadStatus, StoreError> {
        let changed = NotificationRepo::mark_read(&self.pool, notification_id, user_id).await?;
        Ok(MarkReadStatus::from_changed(changed))
    }

    async fn mark_all_read(&self, user_id: DbId) -> Result<u64, StoreError> {
        Ok(NotificationRepo::mark_all_read(&self.pool, user_id).await?)
    }

    async fn mark_read_by_ids(&self, user_id: DbId, ids: &[DbId]) -> Result<u64, StoreError> {
        Ok(NotificationRepo::mark_read_by_ids(&self.pool, user_id, ids).await?)
    }

    async fn count_unread(&self, user_id: DbId) -> Result<i64, StoreError> {
        Ok(NotificationRepo::unread_count(&self.pool, user_id).await?)
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        Ok(NotificationRepo::delete_expired(&self.pool).await?)
    }

    async fn delete_old_read(&self, older_than: Timestamp) -> Result<u64, StoreError> {
        Ok(NotificationRepo::delete_old_read(&self.pool, older_than).await?)
    }

    async fn get_preferences(
        &self,
        user_id: DbId,
    ) -> Result<Option<NotificationPreferences>, StoreError> {
        let row = NotificationPreferenceRepo::get(&self.pool, user_id).await?;
        Ok(row.map(Into::into))
    }

    async fn upsert_preferences(
        &self,
        user_id: DbId,
        update: &PreferencesUpdate,
    ) -> Result<NotificationPreferences, StoreError> {
        let row = NotificationPreferenceRepo::upsert(&self.pool, user_id, update).await?;
        Ok(row.into())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(carecircle_db::health_check(&self.pool).await?)
    }
}
