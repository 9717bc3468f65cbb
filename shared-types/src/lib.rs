//! Shared types between the chat UI and the dispatcher
//!
//! These types travel as JSON over `POST /chat` and the audit inspection
//! endpoints. Both sides deserialize them with serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Core Types
// ============================================================================

/// Identifier of a project whose LLM settings drive dispatch.
///
/// Accepts a JSON string or integer on the wire; integers are kept as their
/// decimal text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(from = "RawProjectId")]
pub struct ProjectId(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProjectId {
    Text(String),
    Number(i64),
}

impl From<RawProjectId> for ProjectId {
    fn from(raw: RawProjectId) -> Self {
        match raw {
            RawProjectId::Text(text) => Self(text),
            RawProjectId::Number(n) => Self(n.to_string()),
        }
    }
}

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ============================================================================
// Chat
// ============================================================================

/// Which agent answers a chat request.
///
/// Unknown or missing modes fall back to `Head`; the request is never
/// rejected because of its mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Head,
    Writer,
}

impl ChatMode {
    /// Parse a wire value. The flag is `true` when the value was not a
    /// recognized mode and `Head` was substituted.
    pub fn parse(raw: &str) -> (Self, bool) {
        match raw.trim().to_ascii_lowercase().as_str() {
            "head" => (Self::Head, false),
            "writer" => (Self::Writer, false),
            _ => (Self::Head, true),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Writer => "writer",
        }
    }
}

impl<'de> Deserialize<'de> for ChatMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Non-string values (numbers, objects) fall back like unknown strings.
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(value)) => Self::parse(&value).0,
            _ => Self::Head,
        })
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "RawChatRequest")]
pub struct ChatRequest {
    pub task: String,
    pub mode: ChatMode,
    pub project_id: ProjectId,
    /// Wire value of `mode` when it was present but not recognized
    #[serde(skip_serializing)]
    pub unrecognized_mode: Option<String>,
}

#[derive(Deserialize)]
struct RawChatRequest {
    task: String,
    #[serde(default)]
    mode: Option<serde_json::Value>,
    project_id: ProjectId,
}

impl From<RawChatRequest> for ChatRequest {
    fn from(raw: RawChatRequest) -> Self {
        let (mode, unrecognized_mode) = match raw.mode {
            None | Some(serde_json::Value::Null) => (ChatMode::Head, None),
            Some(serde_json::Value::String(value)) => match ChatMode::parse(&value) {
                (mode, false) => (mode, None),
                (mode, true) => (mode, Some(value)),
            },
            Some(other) => (ChatMode::Head, Some(other.to_string())),
        };
        Self {
            task: raw.task,
            mode,
            project_id: raw.project_id,
            unrecognized_mode,
        }
    }
}

impl ChatRequest {
    pub fn new(task: impl Into<String>, mode: ChatMode, project_id: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            mode,
            project_id: ProjectId::new(project_id),
            unrecognized_mode: None,
        }
    }
}

/// Agent whose output is returned to the caller. Never the shadow auditor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentLabel {
    HeadAgent,
    WriterAgent,
}

impl AgentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HeadAgent => "HeadAgent",
            Self::WriterAgent => "WriterAgent",
        }
    }
}

impl fmt::Display for AgentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful reply of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub text: String,
    #[serde(rename = "agent")]
    pub agent_label: AgentLabel,
}

// ============================================================================
// Audit
// ============================================================================

/// Shadow note written by the head agent after a writer-mode exchange.
/// Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeadNote {
    /// ULID
    pub id: String,
    pub project_id: ProjectId,
    pub created_at: DateTime<Utc>,
    /// The task exactly as the caller sent it
    pub requested_task: String,
    /// Head model's one-sentence summary of the request
    pub request_summary: String,
    /// Head model's one-sentence summary of the writer's reply
    pub writer_summary: String,
    pub followup_needed: bool,
    /// Head model that produced the note
    pub model: String,
}

impl HeadNote {
    pub fn new_id() -> String {
        ulid::Ulid::new().to_string()
    }
}

/// Response of `GET /projects/{project_id}/notes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectNotes {
    pub project_id: ProjectId,
    pub notes: Vec<HeadNote>,
}

// ============================================================================
// Errors
// ============================================================================

/// Machine-readable error detail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

impl ApiErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
