use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::Message;
use carecircle_core::types::DbId;
use carecircle_events::{Broadcaster, DeliveryChannelError};
use serde_json::json;

use crate::ws::manager::WsManager;

/// `{"type":"unread_count","count":N}` as a text frame.
pub fn unread_count_message(count: i64) -> Message {
    Message::Text(
        json!({ "type": "unread_count", "count": count })
            .to_string()
            .into(),
    )
}

/// Pushes unread counts to a user's open WebSocket connections.
pub struct WsBroadcaster {
    manager: Arc<WsManager>,
}

impl WsBroadcaster {
    pub fn new(manager: Arc<WsManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Broadcaster for WsBroadcaster {
    async fn push_unread_count(
        &self,
        user_id: DbId,
        count: i64,
    ) -> Result<(), DeliveryChannelError> {
        let delivered = self
            .manager
            .send_to_user(user_id, unread_count_message(count))
            .await;
        tracing::debug!(user_id, count, connections = delivered, "Pushed unread count");
        Ok(())
    }
}
