pub mod health;
pub mod notification;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                  WebSocket (token in query string)
///
/// /notifications                       list
/// /notifications/unread-count          unread count
/// /notifications/{id}/read             mark one read (POST)
/// /notifications/read-all              mark all read (POST)
/// /notifications/read-by-source        mark read by source (POST)
/// /notifications/preferences           get, update (GET, PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/notifications", notification::router())
}
