#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use dataops_api::auth::jwt::{generate_access_token, JwtConfig};
use dataops_api::config::{ServerConfig, StoreBackend, StoreConfig};
use dataops_api::router::build_app_router;
use dataops_api::services::metadata::MetadataClient;
use dataops_api::services::queue::{QueueClient, QueueMessage};
use dataops_api::state::AppState;
use dataops_core::error::CoreError;
use dataops_core::resource::MetadataItem;
use dataops_store::{MemoryStore, SharedStore};

pub const TEST_JWT_SECRET: &str = "test-secret-for-integration-tests";

/// Build a test `ServerConfig` with safe defaults and a fast stream poll.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        store: StoreConfig {
            backend: StoreBackend::Memory,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            pool_size: 4,
        },
        metadata_service: "http://metadata.invalid".to_string(),
        queue_service: "http://queue.invalid".to_string(),
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
        },
        sse_ping_interval_secs: 5,
        stream_poll_interval_ms: 20,
        job_ttl_hours: 24,
    }
}

// ---------------------------------------------------------------------------
// Collaborator fakes
// ---------------------------------------------------------------------------

/// Metadata service backed by a fixed item map.
pub struct FakeMetadata(pub HashMap<String, MetadataItem>);

#[async_trait]
impl MetadataClient for FakeMetadata {
    async fn get_item(&self, item_id: &str) -> Result<MetadataItem, CoreError> {
        self.0
            .get(item_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Item {item_id} not found")))
    }
}

fn item(id: &str, item_type: &str, status: &str) -> (String, MetadataItem) {
    (
        id.to_string(),
        MetadataItem {
            id: id.to_string(),
            name: format!("{id}.txt"),
            item_type: item_type.to_string(),
            status: status.to_string(),
        },
    )
}

/// Items known to the fake metadata service in every test app.
pub fn default_metadata() -> FakeMetadata {
    FakeMetadata(HashMap::from([
        item("folder-src", "folder", "ACTIVE"),
        item("folder-dst", "name_folder", "ACTIVE"),
        item("file-1", "file", "ACTIVE"),
        item("file-2", "file", "ACTIVE"),
        item("file-archived", "file", "ARCHIVED"),
    ]))
}

/// Queue service that records messages, or refuses them when `fail` is set.
#[derive(Default)]
pub struct FakeQueue {
    pub fail: bool,
    pub sent: Mutex<Vec<QueueMessage>>,
}

#[async_trait]
impl QueueClient for FakeQueue {
    async fn send_message(&self, message: &QueueMessage) -> Result<(), CoreError> {
        if self.fail {
            return Err(CoreError::ServiceNotAvailable("queue unreachable".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub store: SharedStore,
    pub queue: Arc<FakeQueue>,
    pub shutdown: CancellationToken,
}

/// Full application router over an in-memory store, using the same
/// middleware stack as production.
pub fn build_test_app() -> TestApp {
    build_test_app_with_queue(FakeQueue::default())
}

pub fn build_test_app_with_queue(queue: FakeQueue) -> TestApp {
    let config = test_config();
    let store: SharedStore = Arc::new(MemoryStore::new());
    let queue = Arc::new(queue);
    let shutdown = CancellationToken::new();

    let state = AppState {
        store: store.clone(),
        config: Arc::new(config.clone()),
        metadata: Arc::new(default_metadata()),
        queue: queue.clone(),
        shutdown: shutdown.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        queue,
        shutdown,
    }
}

/// Bearer token for `username`, signed with the test secret.
pub fn token_for(username: &str) -> String {
    generate_access_token(
        &format!("sub-{username}"),
        username,
        3600,
        &test_config().jwt,
    )
    .unwrap()
}

/// A session id owned by `username`.
pub fn session_for(username: &str) -> String {
    format!("{username}-{}", uuid::Uuid::new_v4())
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn post_json(app: &TestApp, uri: &str, body: Value) -> Response {
    send(app, Method::POST, uri, Some(body), None).await
}

pub async fn put_json(app: &TestApp, uri: &str, body: Value) -> Response {
    send(app, Method::PUT, uri, Some(body), None).await
}

pub async fn delete_json(app: &TestApp, uri: &str, body: Value) -> Response {
    send(app, Method::DELETE, uri, Some(body), None).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
