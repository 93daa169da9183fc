//! General question answering through a second, tool-free model call

use crate::base::{required_str, Result, Tool, ToolError};
use async_trait::async_trait;
use parley_providers::{LLMProvider, Message};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub struct GeneralQuestionAnswerTool {
    provider: Arc<dyn LLMProvider>,
    max_tokens: i32,
}

impl GeneralQuestionAnswerTool {
    pub fn new(provider: Arc<dyn LLMProvider>, max_tokens: i32) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }
}

#[async_trait]
impl Tool for GeneralQuestionAnswerTool {
    fn name(&self) -> &str {
        "generalQuestionAnswer"
    }

    fn description(&self) -> &str {
        "Answers any general questions"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The question to answer"
                }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let question = required_str(&args, "question")?;
        info!("General question tool called");

        let response = self
            .provider
            .chat(vec![Message::user(question)], None, None, self.max_tokens, 0.7)
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        Ok(response.content.unwrap_or_default())
    }
}
