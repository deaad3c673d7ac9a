//! Health check handler.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

/// `GET /v1/health` — liveness and metadata store connectivity.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state
        .metadata
        .health_check()
        .await
        .map_err(|e| ApiError::Internal(format!("metadata store unhealthy: {e}")))?;

    Ok(Json(json!({ "status": "ok" })))
}
