pub mod health;
pub mod resource_lock;
pub mod resource_operations;
pub mod task_stream;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the versioned route tree.
///
/// Route hierarchy:
///
/// ```text
/// /v1/health/                      store round trip (204 / 503)
///
/// /v1/tasks/                       job records: get, create, update, delete
///
/// /v1/task-stream/                 status events: SSE tail, write, purge
/// /v1/task-stream/static/          status events: replay
///
/// /v1/files/actions/               copy / delete submission (auth required)
///
/// /v2/resource/lock/               single key: lock, unlock, check
/// /v2/resource/lock/bulk           many keys: lock, unlock
/// ```
pub fn api_routes() -> Router<AppState> {
    let v1 = Router::new()
        .merge(health::router())
        .merge(tasks::router())
        .merge(task_stream::router())
        .merge(resource_operations::router());

    let v2 = Router::new().merge(resource_lock::router());

    Router::new().nest("/v1", v1).nest("/v2", v2)
}
