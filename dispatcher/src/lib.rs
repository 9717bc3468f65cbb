//! Agent Lab dispatcher - routes chat tasks to the head or writer agent
//!
//! Writer-mode replies are shadowed by the head agent, which appends a
//! [`shared_types::HeadNote`] to a per-project audit log in the background.

pub mod actors;
pub mod agents;
pub mod api;
pub mod app_state;
pub mod audit_store;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod model_client;
pub mod project_config;
