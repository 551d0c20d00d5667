use std::sync::Arc;

use carecircle_events::{NotificationStore, PreferenceResolver, SourceReadReconciler};

use crate::config::ServerConfig;
use crate::ws::{WsBroadcaster, WsManager};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NotificationStore>,
    pub preferences: PreferenceResolver,
    pub reconciler: SourceReadReconciler,
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
}

impl AppState {
    /// Wire the engine components around `store`, pushing unread counts
    /// through `ws_manager`.
    pub fn new(
        store: Arc<dyn NotificationStore>,
        config: ServerConfig,
        ws_manager: Arc<WsManager>,
    ) -> Self {
        let broadcaster = Arc::new(WsBroadcaster::new(Arc::clone(&ws_manager)));
        let reconciler = SourceReadReconciler::new(
            Arc::clone(&store),
            broadcaster,
            config.notifications.source_scan_limit,
        );
        Self {
            preferences: PreferenceResolver::new(Arc::clone(&store)),
            reconciler,
            store,
            config: Arc::new(config),
            ws_manager,
        }
    }
}
