use axum::routing::get;
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted under `/v1`.
///
/// ```text
/// GET    /tasks/   -> get_tasks
/// POST   /tasks/   -> create_task
/// PUT    /tasks/   -> update_task
/// DELETE /tasks/   -> delete_tasks
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/tasks/",
        get(tasks::get_tasks)
            .post(tasks::create_task)
            .put(tasks::update_task)
            .delete(tasks::delete_tasks),
    )
}
