use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// GET /v1/health/ -- 204 when the store answers a round trip, 503 otherwise.
async fn health_check(State(state): State<AppState>) -> StatusCode {
    match dataops_store::health_check(state.store.as_ref()).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health/", get(health_check))
}
