//! Loading and saving per-user delivery preferences.

use std::sync::Arc;

use carecircle_core::preferences::{NotificationPreferences, PreferencesUpdate};
use carecircle_core::types::DbId;

use crate::error::StoreError;
use crate::store::NotificationStore;

#[derive(Clone)]
pub struct PreferenceResolver {
    store: Arc<dyn NotificationStore>,
}

impl PreferenceResolver {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Stored preferences, or the defaults if the user never saved any.
    ///
    /// The default record is returned, not written.
    pub async fn get(&self, user_id: DbId) -> Result<NotificationPreferences, StoreError> {
        Ok(self
            .store
            .get_preferences(user_id)
            .await?
            .unwrap_or_else(|| NotificationPreferences::defaults_for(user_id)))
    }

    /// Merge the supplied fields into the stored (or default) record.
    ///
    /// Cross-field validation belongs to the caller; see
    /// `carecircle_core::preferences::validate_update`.
    pub async fn upsert(
        &self,
        user_id: DbId,
        update: &PreferencesUpdate,
    ) -> Result<NotificationPreferences, StoreError> {
        self.store.upsert_preferences(user_id, update).await
    }
}
