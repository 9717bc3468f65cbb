//! HeadAuditActor - background worker for head agent shadow notes
//!
//! The dispatcher casts one [`HeadAuditMsg::RecordShadowNote`] per successful
//! writer reply and returns to the caller without waiting. Each note runs as
//! its own task, at most `max_in_flight` at once, so a slow head model for one
//! project does not hold back notes for another. Every failure is logged and
//! dropped, so a broken audit path can never change a chat response.
//!
//! # Example
//!
//! ```rust,ignore
//! let auditor = spawn_head_auditor(head_agent, audit_store).await?;
//! auditor.cast(HeadAuditMsg::RecordShadowNote(request))?;
//! let stats = flush(&auditor).await?;
//! ```

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort, SpawnErr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::agents::{HeadAgent, ShadowNoteError, ShadowNoteRequest};
use crate::audit_store::AuditStore;

/// Shadow notes composed concurrently by default.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

#[derive(Debug, Default)]
pub struct HeadAuditActor;

pub struct HeadAuditArguments {
    pub head: HeadAgent,
    pub store: Arc<dyn AuditStore>,
    pub max_in_flight: usize,
}

pub struct HeadAuditState {
    head: HeadAgent,
    store: Arc<dyn AuditStore>,
    permits: Arc<Semaphore>,
    tasks: JoinSet<bool>,
    stats: AuditStats,
}

impl HeadAuditState {
    fn settle(&mut self, outcome: Result<bool, JoinError>) {
        match outcome {
            Ok(true) => self.stats.recorded += 1,
            Ok(false) => self.stats.failed += 1,
            Err(err) => {
                self.stats.failed += 1;
                tracing::warn!(error = %err, "Shadow note task did not finish");
            }
        }
    }

    fn reap_finished(&mut self) {
        while let Some(outcome) = self.tasks.try_join_next() {
            self.settle(outcome);
        }
    }
}

/// Counters since the actor started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditStats {
    pub recorded: u64,
    pub failed: u64,
}

#[derive(Debug)]
pub enum HeadAuditMsg {
    /// Fire-and-forget: summarize one writer exchange and append the note.
    RecordShadowNote(ShadowNoteRequest),
    /// Replies once every earlier note has been recorded or has failed.
    Flush { reply: RpcReplyPort<AuditStats> },
}

#[async_trait]
impl Actor for HeadAuditActor {
    type Msg = HeadAuditMsg;
    type State = HeadAuditState;
    type Arguments = HeadAuditArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let max_in_flight = args.max_in_flight.max(1);
        tracing::info!(actor_id = %myself.get_id(), max_in_flight, "HeadAuditActor starting");
        Ok(HeadAuditState {
            head: args.head,
            store: args.store,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            tasks: JoinSet::new(),
            stats: AuditStats::default(),
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.reap_finished();
        match message {
            HeadAuditMsg::RecordShadowNote(request) => {
                let head = state.head.clone();
                let store = state.store.clone();
                let permits = state.permits.clone();
                state.tasks.spawn(async move {
                    // Held until the note is written or dropped.
                    let _permit = permits.acquire_owned().await;
                    record(&head, store.as_ref(), &request).await
                });
            }
            HeadAuditMsg::Flush { reply } => {
                while let Some(outcome) = state.tasks.join_next().await {
                    state.settle(outcome);
                }
                let _ = reply.send(state.stats);
            }
        }
        // Never propagate: an error here would stop the actor.
        Ok(())
    }

    async fn post_stop(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let abandoned = state.tasks.len();
        state.tasks.abort_all();
        tracing::info!(
            actor_id = %myself.get_id(),
            recorded = state.stats.recorded,
            failed = state.stats.failed,
            abandoned,
            "HeadAuditActor stopped"
        );
        Ok(())
    }
}

async fn record(head: &HeadAgent, store: &dyn AuditStore, request: &ShadowNoteRequest) -> bool {
    match head.record_shadow_note(store, request).await {
        Ok(note) => {
            tracing::info!(
                project_id = %note.project_id,
                note_id = %note.id,
                model = %note.model,
                followup_needed = note.followup_needed,
                "Shadow note recorded"
            );
            true
        }
        Err(err) => {
            log_failure(request, &err);
            false
        }
    }
}

fn log_failure(request: &ShadowNoteRequest, err: &ShadowNoteError) {
    let kind = match err {
        ShadowNoteError::Model(_) => "model",
        ShadowNoteError::Ambiguous(_) => "ambiguous",
        ShadowNoteError::Audit(_) => "audit_write",
    };
    tracing::warn!(
        project_id = %request.project_id,
        model = %request.head_model,
        kind,
        error = %err,
        "Shadow note not recorded (non-fatal)"
    );
}

/// Spawn an unnamed auditor with [`DEFAULT_MAX_IN_FLIGHT`].
pub async fn spawn_head_auditor(
    head: HeadAgent,
    store: Arc<dyn AuditStore>,
) -> Result<ActorRef<HeadAuditMsg>, SpawnErr> {
    spawn_head_auditor_with_limit(head, store, DEFAULT_MAX_IN_FLIGHT).await
}

pub async fn spawn_head_auditor_with_limit(
    head: HeadAgent,
    store: Arc<dyn AuditStore>,
    max_in_flight: usize,
) -> Result<ActorRef<HeadAuditMsg>, SpawnErr> {
    let (actor, _handle) = Actor::spawn(
        None,
        HeadAuditActor,
        HeadAuditArguments {
            head,
            store,
            max_in_flight,
        },
    )
    .await?;
    Ok(actor)
}

/// Wait until every note queued before this call has been handled.
pub async fn flush(
    auditor: &ActorRef<HeadAuditMsg>,
) -> Result<AuditStats, ractor::RactorErr<HeadAuditMsg>> {
    ractor::call!(auditor, |reply| HeadAuditMsg::Flush { reply })
}

/// [`flush`] bounded by `limit`. `None` when the limit passed or the actor
/// is gone; notes still in flight are then abandoned by the caller.
pub async fn drain(auditor: &ActorRef<HeadAuditMsg>, limit: Duration) -> Option<AuditStats> {
    match tokio::time::timeout(limit, flush(auditor)).await {
        Ok(Ok(stats)) => Some(stats),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "Head auditor unavailable during drain");
            None
        }
        Err(_) => {
            tracing::warn!(limit_ms = limit.as_millis() as u64, "Shadow note drain timed out");
            None
        }
    }
}
