use axum::routing::post;
use axum::Router;

use crate::handlers::resource_operations;
use crate::state::AppState;

/// Routes mounted under `/v1`.
///
/// ```text
/// POST   /files/actions/   -> submit_operation (auth required)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/files/actions/",
        post(resource_operations::submit_operation),
    )
}
