//! Chat endpoint

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use shared_types::{ChatRequest, ChatResponse};

use crate::app_state::AppState;
use crate::error::DispatchError;

/// POST /chat
///
/// Body `{"task": ..., "mode": "head"|"writer", "project_id": ...}`; `mode`
/// is optional and unknown values fall back to head.
pub async fn post_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, DispatchError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected chat payload");
        DispatchError::Validation(rejection.body_text())
    })?;

    let response = state.dispatcher().handle(request).await?;
    Ok(Json(response))
}
