//! HTTP API routes for the dispatcher
//!
//! `POST /chat` is the only write path. The notes routes are read-only views
//! over the shadow audit log.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

pub mod chat;
pub mod notes;

use crate::app_state::AppState;

/// Configure all API routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(chat::post_chat))
        .route("/projects/{project_id}/notes", get(notes::get_project_notes))
        .route("/notes/recent", get(notes::get_recent_notes))
}

pub async fn health_check(State(_state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "dispatcher",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
