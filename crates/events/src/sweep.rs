//! Periodic notification cleanup.
//!
//! [`CleanupSweeper`] deletes expired notifications and read notifications
//! older than the retention window. Both deletes are idempotent, so the
//! sweeper may overlap with dispatch or with another sweeper.

use std::sync::Arc;
use std::time::Duration;

use carecircle_core::types::Timestamp;
use tokio_util::sync::CancellationToken;

use crate::config::NotificationConfig;
use crate::error::StoreError;
use crate::store::NotificationStore;

/// Rows removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: u64,
    pub old_read: u64,
}

pub struct CleanupSweeper {
    store: Arc<dyn NotificationStore>,
    retention: chrono::Duration,
    interval: Duration,
}

impl CleanupSweeper {
    pub fn new(store: Arc<dyn NotificationStore>, config: &NotificationConfig) -> Self {
        let config = config.clone().normalized();
        Self {
            store,
            retention: chrono::Duration::days(config.read_retention_days),
            interval: config.sweep_interval,
        }
    }

    /// Run the sweep loop until `cancel` fires. The first sweep runs
    /// immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Notification sweeper cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.sweep_once(chrono::Utc::now()).await {
                        tracing::error!(error = %e, "Notification sweep failed");
                    }
                }
            }
        }
    }

    /// Delete expired notifications and read notifications whose `read_at`
    /// is more than the retention window before `now`.
    pub async fn sweep_once(&self, now: Timestamp) -> Result<SweepReport, StoreError> {
        let expired = self.store.delete_expired().await?;
        let old_read = self.store.delete_old_read(now - self.retention).await?;

        if expired > 0 || old_read > 0 {
            tracing::info!(expired, old_read, "Notification sweep removed rows");
        }
        Ok(SweepReport { expired, old_read })
    }
}
