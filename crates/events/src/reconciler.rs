//! Bulk "mark read by source".
//!
//! When a user opens a thread or resource, every unread notification that
//! refers to it is marked read in one batch, and the unread count is pushed
//! once if anything changed.

use std::sync::Arc;

use carecircle_core::source::{normalize_source_value, SourceField};
use carecircle_core::types::DbId;
use carecircle_db::models::notification::NotificationFilter;
use serde::Serialize;

use crate::delivery::{refresh_unread_count, Broadcaster};
use crate::error::NotifyError;
use crate::store::NotificationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadOutcome {
    pub marked_count: u64,
}

#[derive(Clone)]
pub struct SourceReadReconciler {
    store: Arc<dyn NotificationStore>,
    broadcaster: Arc<dyn Broadcaster>,
    scan_limit: i64,
}

impl SourceReadReconciler {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        broadcaster: Arc<dyn Broadcaster>,
        scan_limit: i64,
    ) -> Self {
        Self {
            store,
            broadcaster,
            scan_limit: scan_limit.max(1),
        }
    }

    /// Mark read every unread, visible notification of `user_id` whose
    /// `data[source_field]` equals `source_value`.
    ///
    /// `source_field` must be on the allow-list and `source_value` must be
    /// non-empty after trimming; otherwise the call fails before the store
    /// is touched. Only the newest `scan_limit` unread notifications are
    /// considered.
    pub async fn mark_read_by_source(
        &self,
        user_id: DbId,
        source_field: &str,
        source_value: &str,
    ) -> Result<MarkReadOutcome, NotifyError> {
        let field = SourceField::parse(source_field)?;
        let value = normalize_source_value(source_value)?;

        let filter = NotificationFilter {
            unread_only: true,
            notification_type: None,
        };
        let unread = self
            .store
            .list_for_user(user_id, &filter, self.scan_limit, 0)
            .await?;

        let ids: Vec<DbId> = unread
            .iter()
            .filter(|n| n.data.matches_source(field.key(), value))
            .map(|n| n.id)
            .collect();
        if ids.is_empty() {
            return Ok(MarkReadOutcome { marked_count: 0 });
        }

        let marked_count = self.store.mark_read_by_ids(user_id, &ids).await?;
        if marked_count > 0 {
            self.rebroadcast(user_id).await;
        }

        tracing::debug!(user_id, field = %field, marked_count, "Marked notifications read by source");
        Ok(MarkReadOutcome { marked_count })
    }

    /// Push the current unread count, logging rather than returning failure.
    pub async fn rebroadcast(&self, user_id: DbId) {
        if let Err(e) =
            refresh_unread_count(self.store.as_ref(), self.broadcaster.as_ref(), user_id).await
        {
            tracing::warn!(user_id, error = %e, "Failed to push unread count");
        }
    }
}
