//! Route handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::{AgentInput, AgentOutput};
use crate::error::{Error, Result};

use super::state::AppState;

/// `POST /agent/invoke` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// Agent input
    pub input: AgentInput,
}

/// `POST /agent/invoke` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    /// Agent output
    pub output: AgentOutput,
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /ready
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let vectors = state.agent().index().len();
    if state.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ready", "vectors": vectors })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "empty_index", "vectors": vectors })),
        )
    }
}

/// POST /agent/invoke
pub async fn invoke(
    State(state): State<AppState>,
    payload: std::result::Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Json<InvokeResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        Error::InvalidQuestion(format!("malformed request body: {}", rejection.body_text()))
    })?;
    tracing::info!("Question: \"{}\"", request.input.question);
    let output = state.agent().invoke(request.input).await?;
    Ok(Json(InvokeResponse { output }))
}
