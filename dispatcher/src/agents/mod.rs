//! Agent roles
//!
//! Both agents are stateless wrappers around a shared [`ModelClient`]; they
//! differ only in prompt composition. The head agent additionally owns the
//! shadow-note capability used by the audit actor.
//!
//! [`ModelClient`]: crate::model_client::ModelClient

pub mod head;
pub mod shadow;
pub mod writer;

pub use head::HeadAgent;
pub use shadow::{ShadowNoteError, ShadowNoteRequest, ShadowSummary};
pub use writer::WriterAgent;
