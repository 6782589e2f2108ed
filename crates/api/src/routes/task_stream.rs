//! Route definitions for session status logs.
//!
//! Only the SSE tail requires authentication.

use axum::routing::get;
use axum::Router;

use crate::handlers::task_stream;
use crate::state::AppState;

/// Routes mounted under `/v1`.
///
/// ```text
/// GET    /task-stream/          -> get_status_with_sse (SSE)
/// POST   /task-stream/          -> write_status
/// DELETE /task-stream/          -> delete_status
/// GET    /task-stream/static/   -> get_static_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/task-stream/",
            get(task_stream::get_status_with_sse)
                .post(task_stream::write_status)
                .delete(task_stream::delete_status),
        )
        .route("/task-stream/static/", get(task_stream::get_static_status))
}
