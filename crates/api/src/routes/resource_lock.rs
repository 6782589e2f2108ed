//! Route definitions for resource locks.

use axum::routing::post;
use axum::Router;

use crate::handlers::resource_lock;
use crate::state::AppState;

/// Routes mounted under `/v2`.
///
/// ```text
/// POST   /resource/lock/        -> lock
/// DELETE /resource/lock/        -> unlock
/// GET    /resource/lock/        -> check_lock
/// POST   /resource/lock/bulk    -> bulk_lock
/// DELETE /resource/lock/bulk    -> bulk_unlock
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/resource/lock/",
            post(resource_lock::lock)
                .delete(resource_lock::unlock)
                .get(resource_lock::check_lock),
        )
        .route(
            "/resource/lock/bulk",
            post(resource_lock::bulk_lock).delete(resource_lock::bulk_unlock),
        )
}
