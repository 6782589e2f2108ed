//! Handlers for `/v1/tasks/`: job records per user session.

use axum::extract::{Query, State};
use axum::Json;
use dataops_core::job::{JobRecord, JobSelector, NewJob, DEFAULT_LABEL};
use dataops_store::repositories::job_repo::JobUpdate;
use dataops_store::repositories::JobRepo;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppResult;
use crate::state::AppState;

const TASK_STATUS_SUCCEED: &str = "SUCCEED";

fn default_label() -> String {
    DEFAULT_LABEL.to_string()
}

/// Body of `PUT /v1/tasks/`.
#[derive(Debug, Deserialize)]
pub struct TaskUpdateRequest {
    pub session_id: String,
    #[serde(default = "default_label")]
    pub label: String,
    pub job_id: String,
    pub status: String,
    #[serde(default)]
    pub add_payload: Map<String, Value>,
    #[serde(default)]
    pub progress: i64,
}

#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    pub task_status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub task_info: Vec<JobRecord>,
}

#[derive(Debug, Serialize)]
pub struct TaskInfoResponse {
    pub task_info: JobRecord,
}

/// POST /v1/tasks/
///
/// Register a job. 409 if a job with the same identity already exists.
pub async fn create_task(
    State(state): State<AppState>,
    Json(job): Json<NewJob>,
) -> AppResult<Json<TaskStatusResponse>> {
    JobRepo::create(state.store.as_ref(), job, state.config.job_ttl()).await?;
    Ok(Json(TaskStatusResponse {
        task_status: TASK_STATUS_SUCCEED,
    }))
}

/// GET /v1/tasks/?session_id=...
///
/// Omitted selector fields default to `*`. Newest first.
pub async fn get_tasks(
    State(state): State<AppState>,
    Query(selector): Query<JobSelector>,
) -> AppResult<Json<TaskListResponse>> {
    let task_info = JobRepo::find(state.store.as_ref(), &selector, true).await?;
    Ok(Json(TaskListResponse { task_info }))
}

/// PUT /v1/tasks/
///
/// Update status and progress of a job and merge `add_payload` into its
/// payload. 404 if no job matches.
pub async fn update_task(
    State(state): State<AppState>,
    Json(body): Json<TaskUpdateRequest>,
) -> AppResult<Json<TaskInfoResponse>> {
    let selector = JobSelector::session(body.session_id, body.label).with_job_id(body.job_id);
    let update = JobUpdate {
        status: body.status,
        progress: body.progress,
        add_payload: body.add_payload,
    };
    let task_info =
        JobRepo::update(state.store.as_ref(), &selector, update, state.config.job_ttl()).await?;
    Ok(Json(TaskInfoResponse { task_info }))
}

/// DELETE /v1/tasks/
///
/// Remove every job matching the selector in the body.
pub async fn delete_tasks(
    State(state): State<AppState>,
    Json(selector): Json<JobSelector>,
) -> AppResult<Json<TaskStatusResponse>> {
    JobRepo::delete(state.store.as_ref(), &selector).await?;
    Ok(Json(TaskStatusResponse {
        task_status: TASK_STATUS_SUCCEED,
    }))
}
