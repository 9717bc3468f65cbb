//! Dispatcher tests without the HTTP layer
//!
//! Config comes from an in-code catalog and notes go to an in-memory SQLite
//! store, so every test owns its whole world.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use dispatcher::actors::flush;
use dispatcher::app_state::AppState;
use dispatcher::audit_store::{AuditStore, SqliteAuditStore};
use dispatcher::db;
use dispatcher::error::DispatchError;
use dispatcher::model_client::{ModelClient, ModelError, Prompt};
use dispatcher::project_config::{ProjectCatalog, ProjectCatalogEntry, StaticConfigResolver};
use shared_types::{AgentLabel, ChatMode, ChatRequest, ProjectId};

const VERDICT: &str =
    r#"{"request_summary":"Asked for text.","writer_summary":"Text written.","followup_needed":true}"#;

fn is_shadow_prompt(prompt: &Prompt) -> bool {
    prompt.user.contains("\"followup_needed\"")
}

/// Echoes the task back for primary calls; shadow calls optionally wait for
/// a release signal.
struct EchoModel {
    calls: AtomicUsize,
    shadow_gate: Option<Arc<Notify>>,
}

impl EchoModel {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            shadow_gate: None,
        }
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            shadow_gate: Some(gate),
        }
    }
}

#[async_trait]
impl ModelClient for EchoModel {
    async fn complete(
        &self,
        _base_url: &str,
        model: &str,
        prompt: &Prompt,
    ) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if is_shadow_prompt(prompt) {
            if let Some(gate) = &self.shadow_gate {
                gate.notified().await;
            }
            return Ok(VERDICT.to_string());
        }
        Ok(format!("[{model}] {}", prompt.user.lines().nth(1).unwrap_or_default()))
    }
}

async fn setup(model: EchoModel) -> (AppState, Arc<EchoModel>, Arc<SqliteAuditStore>) {
    let catalog = ProjectCatalog::from_toml_str(
        r#"
[projects.p1]
base_url = "http://127.0.0.1:1234/v1"
head_model = "h1"
writer_model = "w1"

[projects.p2]
base_url = "http://127.0.0.1:11434"
head_model = "h2"
writer_model = "w2"
"#,
    )
    .unwrap();
    let resolver = StaticConfigResolver::from_catalog(&catalog).with_project(
        "blank",
        ProjectCatalogEntry::complete("http://127.0.0.1:1234/v1", "  ", "w1"),
    );

    let model = Arc::new(model);
    let store = Arc::new(SqliteAuditStore::new(db::connect_in_memory().await.unwrap()));
    let state = AppState::new(model.clone(), Arc::new(resolver), store.clone())
        .await
        .unwrap();
    (state, model, store)
}

fn request(task: &str, mode: ChatMode, project_id: &str) -> ChatRequest {
    ChatRequest::new(task, mode, project_id)
}

#[tokio::test]
async fn test_writer_scenario_uses_writer_then_head_model() {
    let (state, _model, store) = setup(EchoModel::new()).await;

    let response = state
        .dispatcher()
        .handle(request("draft a memo", ChatMode::Writer, "p1"))
        .await
        .unwrap();
    assert_eq!(response.agent_label, AgentLabel::WriterAgent);
    assert!(response.text.starts_with("[w1]"));

    flush(&state.auditor()).await.unwrap();
    let notes = store.list_by_project(&ProjectId::new("p1")).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].requested_task, "draft a memo");
    assert_eq!(notes[0].model, "h1");
    assert!(notes[0].followup_needed);
}

#[tokio::test]
async fn test_response_does_not_wait_for_shadow_note() {
    let gate = Arc::new(Notify::new());
    let (state, model, store) = setup(EchoModel::gated(gate.clone())).await;

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        state
            .dispatcher()
            .handle(request("draft a memo", ChatMode::Writer, "p1")),
    )
    .await
    .expect("writer response blocked on the shadow note")
    .unwrap();
    assert_eq!(response.agent_label, AgentLabel::WriterAgent);
    assert!(store
        .list_by_project(&ProjectId::new("p1"))
        .await
        .unwrap()
        .is_empty());

    // Wait for the shadow call to be in flight, then release it.
    while model.calls.load(Ordering::SeqCst) < 2 {
        tokio::task::yield_now().await;
    }
    gate.notify_one();
    let stats = flush(&state.auditor()).await.unwrap();
    assert_eq!(stats.recorded, 1);
    assert_eq!(
        store.list_by_project(&ProjectId::new("p1")).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_concurrent_writer_requests_lose_no_notes() {
    let (state, _model, store) = setup(EchoModel::new()).await;

    let requests = (0..12).map(|i| {
        let state = state.clone();
        let project = if i % 2 == 0 { "p1" } else { "p2" };
        async move {
            state
                .dispatcher()
                .handle(request(&format!("task {i}"), ChatMode::Writer, project))
                .await
        }
    });
    let results = join_all(requests).await;
    assert!(results.iter().all(|r| r.is_ok()));

    flush(&state.auditor()).await.unwrap();
    for (project, model) in [("p1", "h1"), ("p2", "h2")] {
        let notes = store.list_by_project(&ProjectId::new(project)).await.unwrap();
        assert_eq!(notes.len(), 6);
        assert!(notes.iter().all(|n| n.model == model));
        let ids: HashSet<_> = notes.iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids.len(), 6);
    }
}

#[tokio::test]
async fn test_config_errors_stop_before_model_calls() {
    let (state, model, _store) = setup(EchoModel::new()).await;

    let err = state
        .dispatcher()
        .handle(request("hello", ChatMode::Head, "missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::ConfigNotFound(_)));

    let err = state
        .dispatcher()
        .handle(request("hello", ChatMode::Writer, "blank"))
        .await
        .unwrap_err();
    match err {
        DispatchError::ConfigIncomplete(message) => assert!(message.contains("head_model")),
        other => panic!("expected ConfigIncomplete, got {other:?}"),
    }

    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_validation_runs_before_config_lookup() {
    let (state, model, _store) = setup(EchoModel::new()).await;

    let err = state
        .dispatcher()
        .handle(request("  ", ChatMode::Head, "missing"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let err = state
        .dispatcher()
        .handle(request("hello", ChatMode::Head, " "))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_retried_request_records_one_note_per_attempt() {
    let (state, _model, store) = setup(EchoModel::new()).await;

    for _ in 0..2 {
        state
            .dispatcher()
            .handle(request("draft a memo", ChatMode::Writer, "p1"))
            .await
            .unwrap();
    }
    flush(&state.auditor()).await.unwrap();
    assert_eq!(
        store.list_by_project(&ProjectId::new("p1")).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_unrecognized_mode_answers_with_head() {
    let (state, model, store) = setup(EchoModel::new()).await;

    let body = serde_json::json!({"task": "hello", "mode": "poet", "project_id": "p1"});
    let request: ChatRequest = serde_json::from_value(body).unwrap();
    assert_eq!(request.unrecognized_mode.as_deref(), Some("poet"));

    let response = state.dispatcher().handle(request).await.unwrap();
    assert_eq!(response.agent_label, AgentLabel::HeadAgent);
    assert!(response.text.starts_with("[h1]"));

    flush(&state.auditor()).await.unwrap();
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    assert!(store
        .list_by_project(&ProjectId::new("p1"))
        .await
        .unwrap()
        .is_empty());
}
