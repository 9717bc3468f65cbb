//! Shadow-note prompt and reply parsing
//!
//! The head model is asked for one JSON object. Replies are accepted with
//! surrounding prose or code fences; anything that does not yield both
//! summaries and a clear follow-up judgment is `Ambiguous`.

use serde_json::Value;
use shared_types::ProjectId;

use crate::audit_store::AuditError;
use crate::model_client::{ModelError, Prompt};

const SHADOW_SYSTEM_PROMPT: &str = "You are HeadAgent acting as an internal auditor. \
You did not answer the request below; WriterAgent did. Reply with exactly one JSON object \
and nothing else.";

/// Everything the audit actor needs to write one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowNoteRequest {
    pub project_id: ProjectId,
    pub base_url: String,
    pub head_model: String,
    pub task: String,
    pub writer_reply: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowSummary {
    pub request_summary: String,
    pub writer_summary: String,
    pub followup_needed: bool,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ShadowNoteError {
    #[error("shadow note model call failed: {0}")]
    Model(#[from] ModelError),
    #[error("shadow note judgment is ambiguous: {0}")]
    Ambiguous(String),
    #[error(transparent)]
    Audit(#[from] AuditError),
}

pub fn prompt(task: &str, writer_reply: &str) -> Prompt {
    Prompt::new(
        SHADOW_SYSTEM_PROMPT,
        format!(
            "Request sent to WriterAgent:\n<<<\n{task}\n>>>\n\n\
             WriterAgent's reply:\n<<<\n{writer_reply}\n>>>\n\n\
             Return a JSON object with these keys:\n\
             - \"request_summary\": one sentence summarizing what was requested\n\
             - \"writer_summary\": one sentence summarizing the writer's reply\n\
             - \"followup_needed\": true if follow-up action may be needed, otherwise false"
        ),
    )
}

pub fn parse_summary(reply: &str) -> Result<ShadowSummary, ShadowNoteError> {
    let value = first_json_object(reply)
        .ok_or_else(|| ShadowNoteError::Ambiguous("no JSON object in reply".to_string()))?;

    let request_summary = summary_field(&value, "request_summary")?;
    let writer_summary = summary_field(&value, "writer_summary")?;
    let followup_needed = match value.get("followup_needed") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => true,
            "false" | "no" => false,
            other => {
                return Err(ShadowNoteError::Ambiguous(format!(
                    "followup_needed is '{other}'"
                )))
            }
        },
        Some(other) => {
            return Err(ShadowNoteError::Ambiguous(format!(
                "followup_needed is {other}"
            )))
        }
        None => {
            return Err(ShadowNoteError::Ambiguous(
                "followup_needed is missing".to_string(),
            ))
        }
    };

    Ok(ShadowSummary {
        request_summary,
        writer_summary,
        followup_needed,
    })
}

fn summary_field(value: &Value, key: &str) -> Result<String, ShadowNoteError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| ShadowNoteError::Ambiguous(format!("{key} is missing or empty")))
}

/// First `{...}` in `text` that parses as a JSON object. Candidates that
/// are not valid JSON (prose such as `{task}`) are skipped.
fn first_json_object(text: &str) -> Option<Value> {
    text.match_indices('{')
        .filter_map(|(start, _)| balanced_object(&text[start..]))
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate) {
            Ok(value @ Value::Object(_)) => Some(value),
            _ => None,
        })
}

/// Slice of the balanced `{...}` opening at the start of `text`, skipping
/// braces inside JSON strings.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
