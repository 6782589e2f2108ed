use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use dataops_core::stream::StatusEvent;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::operations::{OperationRequest, ResourceOperationDispatcher};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub operation_info: Vec<StatusEvent>,
}

/// POST /v1/files/actions/
///
/// Validate a copy or delete request against the metadata service, record
/// it as RUNNING and hand it to the queue. Returns 202 with the recorded
/// events; the work itself happens downstream.
pub async fn submit_operation(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(request): Json<OperationRequest>,
) -> AppResult<(StatusCode, Json<OperationResponse>)> {
    tracing::info!(
        session_id = %request.session_id,
        operator = %request.operator,
        user = %auth.username,
        operation = ?request.operation,
        targets = request.payload.targets.len(),
        "Resource operation requested",
    );

    let dispatcher = ResourceOperationDispatcher::new(
        state.store.clone(),
        state.metadata.clone(),
        state.queue.clone(),
    );
    let operation_info = dispatcher.execute(&request, &auth.token).await?;

    Ok((StatusCode::ACCEPTED, Json(OperationResponse { operation_info })))
}
