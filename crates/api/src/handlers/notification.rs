//! Handlers for the `/notifications` resource.
//!
//! All endpoints require authentication via [`AuthUser`] and only ever touch
//! the caller's own rows.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use carecircle_core::error::CoreError;
use carecircle_core::preferences::{validate_update, NotificationPreferences, PreferencesUpdate};
use carecircle_core::types::DbId;
use carecircle_db::models::notification::{Notification, NotificationFilter};
use carecircle_events::{MarkReadOutcome, MarkReadStatus};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::{ActionResponse, DataResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query / request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications. Defaults to `false`.
    pub unread_only: Option<bool>,
    /// Only return this wire type, e.g. `CARE_UPDATE`.
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Maximum page size for notification listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for notification listing.
const DEFAULT_LIMIT: i64 = 50;

/// Body of `POST /notifications/read-by-source`.
///
/// Fields are optional so a missing one is reported as a 400 with a
/// message rather than a generic deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadBySourceRequest {
    pub source_field: Option<String>,
    pub source_value: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedCount {
    pub marked_count: u64,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0);
    if offset < 0 {
        return Err(AppError::BadRequest("offset must not be negative".into()));
    }

    let filter = NotificationFilter {
        unread_only: params.unread_only.unwrap_or(false),
        notification_type: params.notification_type,
    };
    let notifications = state
        .store
        .list_for_user(auth.user_id, &filter, limit, offset)
        .await?;

    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UnreadCount>>> {
    let count = state.store.count_unread(auth.user_id).await?;
    Ok(Json(DataResponse {
        data: UnreadCount { count },
    }))
}

/// POST /api/v1/notifications/{id}/read
///
/// Idempotent. Returns 204 No Content, or 404 if the notification does not
/// belong to the caller or has expired. The unread count is pushed only when
/// the notification was unread.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    match state.store.mark_read(auth.user_id, notification_id).await? {
        MarkReadStatus::NotFound => {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Notification",
                id: notification_id,
            }))
        }
        MarkReadStatus::AlreadyRead => {}
        MarkReadStatus::Marked => state.reconciler.rebroadcast(auth.user_id).await,
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ActionResponse<MarkedCount>>> {
    let marked_count = state.store.mark_all_read(auth.user_id).await?;
    if marked_count > 0 {
        state.reconciler.rebroadcast(auth.user_id).await;
    }

    Ok(Json(ActionResponse::ok(
        MarkedCount { marked_count },
        marked_message(marked_count),
    )))
}

/// POST /api/v1/notifications/read-by-source
///
/// Marks every unread notification whose `data[sourceField]` equals
/// `sourceValue`. `sourceField` must be one of the allow-listed source keys.
pub async fn mark_read_by_source(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<MarkReadBySourceRequest>,
) -> AppResult<Json<ActionResponse<MarkReadOutcome>>> {
    let source_field = input
        .source_field
        .ok_or_else(|| AppError::BadRequest("sourceField is required".into()))?;
    let source_value = match input.source_value {
        Some(serde_json::Value::String(value)) => value,
        _ => {
            return Err(AppError::BadRequest(
                "sourceValue must be a non-empty string".into(),
            ))
        }
    };

    let outcome = state
        .reconciler
        .mark_read_by_source(auth.user_id, &source_field, &source_value)
        .await?;

    Ok(Json(ActionResponse::ok(
        outcome,
        marked_message(outcome.marked_count),
    )))
}

fn marked_message(count: u64) -> String {
    format!("Marked {count} notification(s) as read")
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications/preferences
///
/// Returns the stored preferences or, if the user never saved any, the
/// fully-populated defaults.
pub async fn get_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<NotificationPreferences>>> {
    let prefs = state.preferences.get(auth.user_id).await?;
    Ok(Json(DataResponse { data: prefs }))
}

/// PUT /api/v1/notifications/preferences
///
/// Accepts any subset of fields. The update is validated against the state
/// it would produce before anything is written.
pub async fn update_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(update): Json<PreferencesUpdate>,
) -> AppResult<Json<DataResponse<NotificationPreferences>>> {
    let current = state.preferences.get(auth.user_id).await?;
    validate_update(&update, &current.merged(&update))?;

    let saved = state.preferences.upsert(auth.user_id, &update).await?;
    tracing::info!(user_id = auth.user_id, "Notification preferences updated");

    Ok(Json(DataResponse { data: saved }))
}
