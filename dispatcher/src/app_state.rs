use ractor::{ActorRef, SpawnErr};
use std::sync::Arc;

use crate::actors::{spawn_head_auditor, HeadAuditMsg};
use crate::agents::{HeadAgent, WriterAgent};
use crate::audit_store::AuditStore;
use crate::dispatcher::Dispatcher;
use crate::model_client::ModelClient;
use crate::project_config::ConfigResolver;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    dispatcher: Dispatcher,
    audit_store: Arc<dyn AuditStore>,
}

impl AppState {
    /// Spawns the head auditor and wires both agents to `client`.
    pub async fn new(
        client: Arc<dyn ModelClient>,
        resolver: Arc<dyn ConfigResolver>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Result<Self, SpawnErr> {
        let head = HeadAgent::new(client.clone());
        let writer = WriterAgent::new(client);
        let auditor = spawn_head_auditor(head.clone(), audit_store.clone()).await?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                dispatcher: Dispatcher::new(resolver, head, writer, auditor),
                audit_store,
            }),
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn audit_store(&self) -> Arc<dyn AuditStore> {
        self.inner.audit_store.clone()
    }

    pub fn auditor(&self) -> ActorRef<HeadAuditMsg> {
        self.inner.dispatcher.auditor().clone()
    }
}
