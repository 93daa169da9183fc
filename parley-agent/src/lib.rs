//! Agent logic for parley
//!
//! This crate provides the conversation orchestrator and prompt building.

pub mod agent_loop;
pub mod context;

pub use agent_loop::{AgentError, AgentLoop};
pub use context::{ContextBuilder, SYSTEM_PROMPT};
