//! Route definitions for the `/notifications` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                  -> list_notifications
/// GET    /unread-count      -> unread_count
/// POST   /{id}/read         -> mark_read
/// POST   /read-all          -> mark_all_read
/// POST   /read-by-source    -> mark_read_by_source
/// GET    /preferences       -> get_preferences
/// PUT    /preferences       -> update_preferences
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notification::list_notifications))
        .route("/unread-count", get(notification::unread_count))
        .route("/{id}/read", post(notification::mark_read))
        .route("/read-all", post(notification::mark_all_read))
        .route("/read-by-source", post(notification::mark_read_by_source))
        .route(
            "/preferences",
            get(notification::get_preferences).put(notification::update_preferences),
        )
}
