//! Context builder for assembling prompts

use parley_core::session::{ChatMessage, Role};
use parley_providers::{Message, ToolCallRequest};

/// Fixed system instruction sent with every chat request
pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that provides accurate and concise information.";

/// Builds the context for LLM requests
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::with_system_prompt(SYSTEM_PROMPT)
    }

    pub fn with_system_prompt(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Build the complete message list for an LLM call
    pub fn build_messages(&self, history: &[ChatMessage], current_message: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system_prompt.clone()));

        for msg in history {
            messages.push(match msg.role {
                Role::User => Message::user(msg.content.clone()),
                Role::Assistant => Message::assistant(msg.content.clone()),
            });
        }

        messages.push(Message::user(current_message));
        messages
    }

    /// Add a tool result to the message list
    pub fn add_tool_result(
        &self,
        messages: &mut Vec<Message>,
        tool_call_id: String,
        tool_name: String,
        result: String,
    ) {
        messages.push(Message::tool(result, tool_call_id, tool_name));
    }

    /// Add an assistant message with optional tool calls
    pub fn add_assistant_message(
        &self,
        messages: &mut Vec<Message>,
        content: Option<String>,
        tool_calls: Option<Vec<ToolCallRequest>>,
    ) {
        let mut msg = Message::assistant(content.unwrap_or_default());
        msg.tool_calls = tool_calls;
        messages.push(msg);
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
