//! LLM provider integrations for parley
//!
//! This crate provides the provider abstraction and the Gemini client.

pub mod base;
pub mod gemini;

pub use base::{
    LLMProvider, LLMResponse, Message, ProviderError, ProviderResult, ToolCallRequest,
};
pub use gemini::{to_function_declaration, GeminiClient};
