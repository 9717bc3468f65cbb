use chrono::{SubsecRound, Utc};
use shared_types::HeadNote;
use std::sync::Arc;

use super::shadow::{self, ShadowNoteError, ShadowNoteRequest};
use crate::audit_store::AuditStore;
use crate::model_client::{ModelClient, ModelError, Prompt};

const HEAD_SYSTEM_PROMPT: &str = "You are HeadAgent, the lead agent of a multi-agent lab. \
You take plain-language requests and answer them directly and concisely. \
Prefer short, concrete answers; use lists only when they make the answer clearer.";

/// Default responder and, for writer-mode requests, the shadow auditor.
#[derive(Clone)]
pub struct HeadAgent {
    client: Arc<dyn ModelClient>,
}

impl HeadAgent {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    /// Answer `task` as the primary agent.
    pub async fn respond(
        &self,
        base_url: &str,
        model: &str,
        task: &str,
    ) -> Result<String, ModelError> {
        self.client
            .complete(base_url, model, &Prompt::new(HEAD_SYSTEM_PROMPT, task))
            .await
    }

    /// Summarize a writer exchange with the head model. Nothing is stored.
    pub async fn compose_shadow_note(
        &self,
        request: &ShadowNoteRequest,
    ) -> Result<HeadNote, ShadowNoteError> {
        let reply = self
            .client
            .complete(
                &request.base_url,
                &request.head_model,
                &shadow::prompt(&request.task, &request.writer_reply),
            )
            .await?;
        let summary = shadow::parse_summary(&reply)?;

        Ok(HeadNote {
            id: HeadNote::new_id(),
            project_id: request.project_id.clone(),
            created_at: Utc::now().trunc_subsecs(6),
            requested_task: request.task.clone(),
            request_summary: summary.request_summary,
            writer_summary: summary.writer_summary,
            followup_needed: summary.followup_needed,
            model: request.head_model.clone(),
        })
    }

    /// Compose a shadow note and append it to `store`.
    pub async fn record_shadow_note(
        &self,
        store: &dyn AuditStore,
        request: &ShadowNoteRequest,
    ) -> Result<HeadNote, ShadowNoteError> {
        let note = self.compose_shadow_note(request).await?;
        store.append(&note).await?;
        Ok(note)
    }
}
