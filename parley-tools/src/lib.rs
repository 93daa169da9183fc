//! Built-in tools for parley
//!
//! This crate provides the tool registry and the tools exposed to the model.

pub mod base;
pub mod general;
pub mod people;
pub mod recipe;
pub mod registry;
pub mod weather;

pub use base::{Tool, ToolError};
pub use general::GeneralQuestionAnswerTool;
pub use people::{GuessAgeTool, GuessGenderTool};
pub use recipe::{Recipe, RecipeTool};
pub use registry::ToolRegistry;
pub use weather::WeatherTool;

use parley_core::config::Config;
use parley_providers::LLMProvider;
use std::sync::Arc;
use std::time::Duration;

/// Build a registry holding every built-in tool
pub fn builtin_registry(provider: Arc<dyn LLMProvider>, config: &Config) -> ToolRegistry {
    let max_tokens = i32::try_from(config.agent.max_output_tokens).unwrap_or(i32::MAX);
    let client = people::http_client(Duration::from_secs(config.tools.http_timeout_secs));

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(GeneralQuestionAnswerTool::new(
        provider.clone(),
        max_tokens,
    )));
    registry.register(Arc::new(WeatherTool));
    registry.register(Arc::new(GuessAgeTool::new(
        client.clone(),
        config.tools.agify_base.clone(),
    )));
    registry.register(Arc::new(GuessGenderTool::new(
        client,
        config.tools.genderize_base.clone(),
    )));
    registry.register(Arc::new(RecipeTool::new(provider, max_tokens)));
    registry
}
