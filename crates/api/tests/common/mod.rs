#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use carecircle_api::auth::jwt::{generate_access_token, JwtConfig};
use carecircle_api::config::ServerConfig;
use carecircle_api::router::build_app_router;
use carecircle_api::state::AppState;
use carecircle_api::ws::WsManager;
use carecircle_core::notification::{NotificationContent, NotificationData, NotificationType};
use carecircle_core::types::DbId;
use carecircle_events::{InMemoryNotificationStore, NotificationConfig, NotificationStore};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret-not-for-production";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        notifications: NotificationConfig::default(),
    }
}

/// Everything a test needs to drive the API and inspect its effects.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<InMemoryNotificationStore>,
    pub ws_manager: Arc<WsManager>,
}

/// Build the full application router over an in-memory store, using the
/// same middleware stack as `main.rs`.
pub fn build_test_app() -> TestApp {
    let store = Arc::new(InMemoryNotificationStore::new());
    let ws_manager = Arc::new(WsManager::new());
    let state = AppState::new(store.clone(), test_config(), Arc::clone(&ws_manager));

    TestApp {
        app: build_app_router(state),
        store,
        ws_manager,
    }
}

pub fn token_for(user_id: DbId) -> String {
    generate_access_token(user_id, &test_config().jwt).unwrap()
}

/// Persist a notification carrying `data` for `user_id`.
pub async fn seed(
    store: &InMemoryNotificationStore,
    user_id: DbId,
    notification_type: NotificationType,
    data: NotificationData,
) -> DbId {
    let content = NotificationContent::new(notification_type, "Title", "Message").with_data(data);
    store.create(user_id, &content).await.unwrap().id
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    json_request(app, Method::POST, uri, body, token).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    json_request(app, Method::PUT, uri, body, token).await
}

async fn json_request(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
