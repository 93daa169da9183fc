//! Session management for conversation history
//!
//! Histories live in memory only and are bounded per session; they are lost
//! when the process exits.

pub mod store;

pub use store::{ChatMessage, Role, Session, SessionStore};
