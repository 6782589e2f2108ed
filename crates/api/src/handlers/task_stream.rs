//! Handlers for `/v1/task-stream/`: status event logs per session.
//!
//! Writers append events; readers either fetch everything recorded so far
//! (`/static/`) or hold an SSE connection that delivers new events as they
//! arrive.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use dataops_core::error::CoreError;
use dataops_core::stream::{filter_events, StatusEvent, StatusEventInput, StatusFilter};
use dataops_store::repositories::stream_repo::OFFSET_START;
use dataops_store::repositories::{StatusStreamRepo, TailOptions};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Query for reading a session log. `request_timeout` only applies to the
/// SSE tail.
#[derive(Debug, Deserialize)]
pub struct StatusStreamQuery {
    pub session_id: String,
    pub container_code: Option<String>,
    pub container_type: Option<String>,
    pub action_type: Option<String>,
    /// JSON array string, e.g. `["a.txt"]`; anything else is one name.
    pub target_names: Option<String>,
    pub job_id: Option<String>,
    /// Seconds before the tail closes; absent or 0 tails until disconnect.
    pub request_timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PurgeQuery {
    pub user: String,
}

#[derive(Debug, Serialize)]
pub struct StreamInfoResponse<T: Serialize> {
    pub stream_info: T,
    pub total: usize,
}

/// Parse a `target_names` query value.
fn parse_target_names(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(names) => names,
        Err(_) => vec![raw.to_string()],
    }
}

impl StatusStreamQuery {
    fn filter(&self) -> Result<StatusFilter, CoreError> {
        let job_id = match self.job_id.as_deref().filter(|v| !v.is_empty()) {
            Some(raw) => {
                Uuid::parse_str(raw)
                    .map_err(|_| CoreError::Validation(format!("Invalid job_id {raw}")))?;
                Some(raw.to_string())
            }
            None => None,
        };

        Ok(StatusFilter {
            container_code: self.container_code.clone(),
            container_type: self.container_type.clone(),
            action_type: self.action_type.clone(),
            target_names: self
                .target_names
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(parse_target_names),
            job_id,
        })
    }

    fn timeout(&self) -> Option<Duration> {
        self.request_timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

/// POST /v1/task-stream/
///
/// Validate and append a status event. 422 on any invalid field.
pub async fn write_status(
    State(state): State<AppState>,
    Json(input): Json<StatusEventInput>,
) -> AppResult<Json<StreamInfoResponse<StatusEvent>>> {
    let event = StatusStreamRepo::append(state.store.as_ref(), input).await?;
    Ok(Json(StreamInfoResponse {
        stream_info: event,
        total: 1,
    }))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /v1/task-stream/static/
///
/// Every recorded event of the session that matches the filters.
pub async fn get_static_status(
    State(state): State<AppState>,
    Query(params): Query<StatusStreamQuery>,
) -> AppResult<Json<StreamInfoResponse<Vec<StatusEvent>>>> {
    let filter = params.filter()?;
    let events =
        StatusStreamRepo::replay(state.store.as_ref(), &params.session_id, OFFSET_START).await?;
    let events = filter_events(events, &filter);
    Ok(Json(StreamInfoResponse {
        total: events.len(),
        stream_info: events,
    }))
}

/// GET /v1/task-stream/
///
/// Server-sent events: each matching status event is sent as one JSON
/// `data:` line. Callers may only tail their own sessions, i.e. session ids
/// starting with their username.
pub async fn get_status_with_sse(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<StatusStreamQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if !params.session_id.starts_with(&auth.username) {
        return Err(AppError::BadRequest(format!(
            "Session {} does not belong to {}",
            params.session_id, auth.username
        )));
    }

    let filter = params.filter()?;
    let options = TailOptions {
        poll_interval: state.config.stream_poll_interval(),
        timeout: params.timeout(),
    };

    // Cancelled on shutdown, or when the response body (and with it the
    // guard) is dropped because the client went away.
    let cancel = state.shutdown.child_token();
    let guard = cancel.clone().drop_guard();

    tracing::info!(
        session_id = %params.session_id,
        user = %auth.username,
        timeout_secs = params.request_timeout.unwrap_or(0),
        "Status tail opened",
    );

    let tail = StatusStreamRepo::tail(
        state.store.clone(),
        params.session_id,
        OFFSET_START.to_string(),
        filter,
        options,
        cancel,
    );

    let events = tail.map(move |item| {
        let _keep_alive_until_dropped = &guard;
        Ok(to_sse_event(item))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(state.config.sse_ping_interval())))
}

fn to_sse_event(item: Result<StatusEvent, CoreError>) -> Event {
    match item {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json) => Event::default().data(json),
            Err(e) => Event::default().event("error").data(e.to_string()),
        },
        Err(e) => Event::default().event("error").data(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Purge
// ---------------------------------------------------------------------------

/// DELETE /v1/task-stream/?user=
///
/// Remove every log whose session id starts with `user`.
pub async fn delete_status(
    State(state): State<AppState>,
    Query(params): Query<PurgeQuery>,
) -> AppResult<Json<StreamInfoResponse<Vec<String>>>> {
    let removed = StatusStreamRepo::purge_user(state.store.as_ref(), &params.user).await?;
    Ok(Json(StreamInfoResponse {
        total: removed.len(),
        stream_info: removed,
    }))
}
