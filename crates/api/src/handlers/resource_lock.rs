//! Handlers for `/v2/resource/lock`.
//!
//! Lock conflicts map to 409; releases that do not apply map to 400.

use axum::extract::{Query, State};
use axum::Json;
use dataops_core::error::CoreError;
use dataops_core::lock::LockOperation;
use dataops_store::repositories::lock_repo::KeyOutcome;
use dataops_store::repositories::ResourceLockRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LockRequest {
    pub resource_key: String,
    pub operation: LockOperation,
}

#[derive(Debug, Deserialize)]
pub struct BulkLockRequest {
    pub resource_keys: Vec<String>,
    pub operation: LockOperation,
}

#[derive(Debug, Deserialize)]
pub struct LockStatusQuery {
    pub resource_key: String,
}

#[derive(Debug, Serialize)]
pub struct LockResponse {
    pub key: String,
    pub status: bool,
}

/// Raw `"<read>,<write>"` state, `null` when idle.
#[derive(Debug, Serialize)]
pub struct LockStatusResponse {
    pub key: String,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkLockResponse {
    pub keys_status: Vec<KeyOutcome>,
}

fn all_succeeded(outcomes: &[KeyOutcome]) -> bool {
    outcomes.iter().all(|(_, ok)| *ok)
}

// ---------------------------------------------------------------------------
// Single key
// ---------------------------------------------------------------------------

/// POST /v2/resource/lock/
pub async fn lock(
    State(state): State<AppState>,
    Json(body): Json<LockRequest>,
) -> AppResult<Json<LockResponse>> {
    let granted =
        ResourceLockRepo::acquire(state.store.as_ref(), &body.resource_key, body.operation).await?;
    if !granted {
        return Err(AppError::Core(CoreError::AlreadyExists(format!(
            "Resource {} is already locked",
            body.resource_key
        ))));
    }
    Ok(Json(LockResponse {
        key: body.resource_key,
        status: true,
    }))
}

/// DELETE /v2/resource/lock/
pub async fn unlock(
    State(state): State<AppState>,
    Json(body): Json<LockRequest>,
) -> AppResult<Json<LockResponse>> {
    let released =
        ResourceLockRepo::release(state.store.as_ref(), &body.resource_key, body.operation).await?;
    if !released {
        return Err(AppError::BadRequest(format!(
            "Resource {} holds no {} lock to release",
            body.resource_key,
            body.operation.as_str()
        )));
    }
    Ok(Json(LockResponse {
        key: body.resource_key,
        status: true,
    }))
}

/// GET /v2/resource/lock/?resource_key=
pub async fn check_lock(
    State(state): State<AppState>,
    Query(params): Query<LockStatusQuery>,
) -> AppResult<Json<LockStatusResponse>> {
    let status = ResourceLockRepo::status(state.store.as_ref(), &params.resource_key).await?;
    Ok(Json(LockStatusResponse {
        key: params.resource_key,
        status,
    }))
}

// ---------------------------------------------------------------------------
// Bulk
// ---------------------------------------------------------------------------

/// POST /v2/resource/lock/bulk
///
/// Stops at the first key that cannot be locked; earlier keys stay locked.
pub async fn bulk_lock(
    State(state): State<AppState>,
    Json(body): Json<BulkLockRequest>,
) -> AppResult<Json<BulkLockResponse>> {
    let outcomes =
        ResourceLockRepo::bulk_acquire(state.store.as_ref(), &body.resource_keys, body.operation)
            .await?;
    if !all_succeeded(&outcomes) {
        return Err(AppError::Core(CoreError::AlreadyExists(
            "One or more resources are already locked".into(),
        )));
    }
    Ok(Json(BulkLockResponse {
        keys_status: outcomes,
    }))
}

/// DELETE /v2/resource/lock/bulk
pub async fn bulk_unlock(
    State(state): State<AppState>,
    Json(body): Json<BulkLockRequest>,
) -> AppResult<Json<BulkLockResponse>> {
    let outcomes =
        ResourceLockRepo::bulk_release(state.store.as_ref(), &body.resource_keys, body.operation)
            .await?;
    if !all_succeeded(&outcomes) {
        return Err(AppError::BadRequest(
            "One or more locks could not be released".into(),
        ));
    }
    Ok(Json(BulkLockResponse {
        keys_status: outcomes,
    }))
}
