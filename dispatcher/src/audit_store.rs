//! AuditStore - append-only log of head agent shadow notes
//!
//! Notes are never updated or deleted. Reads come back ordered by
//! `created_at`, ties broken by insertion order (the `seq` column).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use shared_types::{HeadNote, ProjectId};
use sqlx::SqlitePool;

/// Fixed-width UTC format so that text ordering equals time ordering.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit write failed: {0}")]
    WriteFailed(String),
    #[error("audit read failed: {0}")]
    ReadFailed(String),
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Durably insert `note`, returning its id.
    async fn append(&self, note: &HeadNote) -> Result<String, AuditError>;

    /// All notes for one project, oldest first.
    async fn list_by_project(&self, project_id: &ProjectId) -> Result<Vec<HeadNote>, AuditError>;

    /// Newest notes across every project.
    async fn list_recent(&self, limit: i64) -> Result<Vec<HeadNote>, AuditError>;
}

#[derive(Debug, Clone)]
pub struct SqliteAuditStore {
    pool: SqlitePool,
}

type NoteRow = (String, String, String, String, String, String, bool, String);

impl SqliteAuditStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn note_from_row(row: NoteRow) -> Result<HeadNote, AuditError> {
        let (
            id,
            project_id,
            created_at,
            requested_task,
            request_summary,
            writer_summary,
            followup_needed,
            model,
        ) = row;
        let naive = NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT)
            .map_err(|e| AuditError::ReadFailed(format!("invalid timestamp {created_at}: {e}")))?;
        Ok(HeadNote {
            id,
            project_id: ProjectId::new(project_id),
            created_at: DateTime::from_naive_utc_and_offset(naive, Utc),
            requested_task,
            request_summary,
            writer_summary,
            followup_needed,
            model,
        })
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, note: &HeadNote) -> Result<String, AuditError> {
        sqlx::query(
            r#"
            INSERT INTO head_notes
                (id, project_id, created_at, requested_task, request_summary,
                 writer_summary, followup_needed, model)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&note.id)
        .bind(note.project_id.as_str())
        .bind(note.created_at.format(TIMESTAMP_FORMAT).to_string())
        .bind(&note.requested_task)
        .bind(&note.request_summary)
        .bind(&note.writer_summary)
        .bind(note.followup_needed)
        .bind(&note.model)
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::WriteFailed(e.to_string()))?;

        Ok(note.id.clone())
    }

    async fn list_by_project(&self, project_id: &ProjectId) -> Result<Vec<HeadNote>, AuditError> {
        let rows: Vec<NoteRow> = sqlx::query_as(
            r#"
            SELECT id, project_id, created_at, requested_task, request_summary,
                   writer_summary, followup_needed, model
            FROM head_notes
            WHERE project_id = ?
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(project_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuditError::ReadFailed(e.to_string()))?;

        rows.into_iter().map(Self::note_from_row).collect()
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<HeadNote>, AuditError> {
        let safe_limit = limit.clamp(1, 500);
        let rows: Vec<NoteRow> = sqlx::query_as(
            r#"
            SELECT id, project_id, created_at, requested_task, request_summary,
                   writer_summary, followup_needed, model
            FROM head_notes
            ORDER BY created_at DESC, seq DESC
            LIMIT ?
            "#,
        )
        .bind(safe_limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuditError::ReadFailed(e.to_string()))?;

        rows.into_iter().map(Self::note_from_row).collect()
    }
}
