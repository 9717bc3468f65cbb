//! Actor-based background workers

pub mod head_auditor;

pub use head_auditor::{
    drain, flush, spawn_head_auditor, spawn_head_auditor_with_limit, AuditStats, HeadAuditActor,
    HeadAuditArguments, HeadAuditMsg, DEFAULT_MAX_IN_FLIGHT,
};
