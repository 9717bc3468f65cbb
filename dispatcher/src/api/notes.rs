//! Read-only views over the shadow audit log

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use shared_types::{HeadNote, ProjectId, ProjectNotes};

use crate::app_state::AppState;
use crate::error::DispatchError;

const DEFAULT_RECENT_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// GET /projects/{project_id}/notes, oldest first.
pub async fn get_project_notes(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectNotes>, DispatchError> {
    let project_id = ProjectId::new(project_id);
    if project_id.is_blank() {
        return Err(DispatchError::Validation(
            "project_id must not be empty".to_string(),
        ));
    }

    let notes = state.audit_store().list_by_project(&project_id).await?;
    Ok(Json(ProjectNotes { project_id, notes }))
}

/// GET /notes/recent?limit=N, newest first across all projects.
pub async fn get_recent_notes(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<HeadNote>>, DispatchError> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let notes = state.audit_store().list_recent(limit).await?;
    Ok(Json(notes))
}
