//! Dispatcher - single entry point for chat requests
//!
//! Flow per request: validate, resolve project config, call the primary
//! agent, and for writer mode hand the finished exchange to the head auditor
//! before returning. Configuration failures stop before any model call.

use ractor::ActorRef;
use shared_types::{AgentLabel, ChatMode, ChatRequest, ChatResponse};
use std::sync::Arc;

use crate::actors::HeadAuditMsg;
use crate::agents::{HeadAgent, ShadowNoteRequest, WriterAgent};
use crate::error::DispatchError;
use crate::project_config::ConfigResolver;

#[derive(Clone)]
pub struct Dispatcher {
    resolver: Arc<dyn ConfigResolver>,
    head: HeadAgent,
    writer: WriterAgent,
    auditor: ActorRef<HeadAuditMsg>,
}

impl Dispatcher {
    pub fn new(
        resolver: Arc<dyn ConfigResolver>,
        head: HeadAgent,
        writer: WriterAgent,
        auditor: ActorRef<HeadAuditMsg>,
    ) -> Self {
        Self {
            resolver,
            head,
            writer,
            auditor,
        }
    }

    pub fn auditor(&self) -> &ActorRef<HeadAuditMsg> {
        &self.auditor
    }

    pub async fn handle(&self, request: ChatRequest) -> Result<ChatResponse, DispatchError> {
        if request.task.trim().is_empty() {
            return Err(DispatchError::Validation("task must not be empty".to_string()));
        }
        if request.project_id.is_blank() {
            return Err(DispatchError::Validation(
                "project_id must not be empty".to_string(),
            ));
        }
        if let Some(raw) = &request.unrecognized_mode {
            tracing::warn!(
                project_id = %request.project_id,
                mode = %raw,
                "Unrecognized mode, answering with head agent"
            );
        }

        let config = self
            .resolver
            .resolve(&request.project_id)
            .await
            .map_err(|err| {
                tracing::warn!(
                    project_id = %request.project_id,
                    mode = request.mode.as_str(),
                    error = %err,
                    "Project config resolution failed"
                );
                DispatchError::from(err)
            })?;

        match request.mode {
            ChatMode::Head => {
                tracing::info!(
                    project_id = %request.project_id,
                    model = %config.head_model,
                    agent = "HeadAgent",
                    "Dispatching chat request"
                );
                let text = self
                    .head
                    .respond(&config.base_url, &config.head_model, &request.task)
                    .await
                    .map_err(|err| log_primary_failure(AgentLabel::HeadAgent, err))?;
                Ok(ChatResponse {
                    text,
                    agent_label: AgentLabel::HeadAgent,
                })
            }
            ChatMode::Writer => {
                tracing::info!(
                    project_id = %request.project_id,
                    model = %config.writer_model,
                    agent = "WriterAgent",
                    "Dispatching chat request"
                );
                let text = self
                    .writer
                    .respond(&config.base_url, &config.writer_model, &request.task)
                    .await
                    .map_err(|err| log_primary_failure(AgentLabel::WriterAgent, err))?;

                let shadow = ShadowNoteRequest {
                    project_id: request.project_id,
                    base_url: config.base_url,
                    head_model: config.head_model,
                    task: request.task,
                    writer_reply: text.clone(),
                };
                if let Err(err) = self.auditor.cast(HeadAuditMsg::RecordShadowNote(shadow)) {
                    tracing::warn!(error = %err, "Head auditor unavailable; shadow note skipped");
                }

                Ok(ChatResponse {
                    text,
                    agent_label: AgentLabel::WriterAgent,
                })
            }
        }
    }
}

fn log_primary_failure(agent: AgentLabel, err: crate::model_client::ModelError) -> DispatchError {
    tracing::error!(agent = %agent, error = %err, "Primary agent call failed");
    DispatchError::from(err)
}
