//! Conversation orchestrator: history in, model and tool rounds, history out

use crate::context::ContextBuilder;
use parley_core::config::AgentConfig;
use parley_core::session::SessionStore;
use parley_core::utils::preview;
use parley_providers::{LLMProvider, LLMResponse, Message, ProviderError};
use parley_tools::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const FALLBACK_ANSWER: &str = "I've completed processing but have no response to give.";

/// Why an exchange failed; history is untouched in every case
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("LLM request timed out after {0:?}")]
    Timeout(Duration),
}

/// Answers chat questions with session history and tool calling
pub struct AgentLoop {
    provider: Arc<dyn LLMProvider>,
    tools: ToolRegistry,
    sessions: Arc<SessionStore>,
    context: ContextBuilder,
    max_tokens: i32,
    temperature: f64,
    max_iterations: usize,
    request_timeout: Duration,
}

impl AgentLoop {
    /// Create a new orchestrator
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tools: ToolRegistry,
        sessions: Arc<SessionStore>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            sessions,
            context: ContextBuilder::new(),
            max_tokens: i32::try_from(config.max_output_tokens).unwrap_or(i32::MAX),
            temperature: f64::from(config.temperature),
            max_iterations: config.max_tool_iterations.max(1) as usize,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Replace the prompt builder
    pub fn with_context(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer `question` in the context of `session_id`
    ///
    /// An empty `session_id` makes the exchange stateless. The exchange is
    /// recorded only after the model produced an answer.
    pub async fn handle_chat(&self, question: &str, session_id: &str) -> Result<String, AgentError> {
        info!(
            "Processing question for session '{}': {} (model: {})",
            session_id,
            preview(question, 80),
            self.provider.get_default_model()
        );

        let history = self.sessions.get(session_id);
        let mut messages = self.context.build_messages(&history, question);
        let definitions = self.tools.get_definitions();

        let mut final_content: Option<String> = None;

        for iteration in 1..=self.max_iterations {
            debug!("Agent iteration {}/{}", iteration, self.max_iterations);

            let response = self.call_provider(messages.clone(), &definitions).await?;

            if response.has_tool_calls() {
                info!("LLM requested {} tool calls", response.tool_calls.len());

                self.context.add_assistant_message(
                    &mut messages,
                    response.content.clone(),
                    Some(response.tool_calls.clone()),
                );

                for tool_call in &response.tool_calls {
                    let params = serde_json::to_value(&tool_call.arguments)
                        .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));
                    info!("Tool call: {}({})", tool_call.name, preview(&params.to_string(), 200));

                    let result = self.run_tool(&tool_call.name, params).await;
                    debug!("Tool {} returned: {}", tool_call.name, preview(&result, 200));

                    self.context.add_tool_result(
                        &mut messages,
                        tool_call.id.clone(),
                        tool_call.name.clone(),
                        result,
                    );
                }
            } else {
                final_content = Some(response.content.unwrap_or_default());
                break;
            }
        }

        // Still calling tools when the budget ran out: answer, but record nothing
        let Some(answer) = final_content else {
            warn!(
                "Tool calls still pending after {} iterations",
                self.max_iterations
            );
            return Ok(FALLBACK_ANSWER.to_string());
        };

        info!("Answer for session '{}': {}", session_id, preview(&answer, 120));
        // An empty answer leaves the history as it was
        self.sessions.append(session_id, question, &answer);

        Ok(answer)
    }

    async fn call_provider(
        &self,
        messages: Vec<Message>,
        definitions: &[serde_json::Value],
    ) -> Result<LLMResponse, AgentError> {
        let tools = if definitions.is_empty() {
            None
        } else {
            Some(definitions.to_vec())
        };

        let request = self
            .provider
            .chat(messages, tools, None, self.max_tokens, self.temperature);

        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AgentError::Timeout(self.request_timeout)),
        }
    }

    /// Tools calling back into the model get the same deadline as direct calls
    async fn run_tool(&self, name: &str, params: serde_json::Value) -> String {
        match tokio::time::timeout(self.request_timeout, self.tools.execute(name, params)).await {
            Ok(result) => result,
            Err(_) => format!(
                "Error executing {}: timed out after {:?}",
                name, self.request_timeout
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_core::config::TrimMode;
    use parley_core::session::Role;
    use parley_providers::{ProviderResult, ToolCallRequest};
    use parley_tools::{Tool, ToolError};
    use serde_json::{json, Value};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Replays canned responses and records every request it sees
    #[derive(Default)]
    struct ScriptedProvider {
        replies: Mutex<VecDeque<ProviderResult<LLMResponse>>>,
        requests: Mutex<Vec<Vec<Message>>>,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<ProviderResult<LLMResponse>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }

        fn requests(&self) -> Vec<Vec<Message>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn chat(
            &self,
            messages: Vec<Message>,
            _tools: Option<Vec<Value>>,
            _model: Option<String>,
            _max_tokens: i32,
            _temperature: f64,
        ) -> ProviderResult<LLMResponse> {
            self.requests.lock().unwrap().push(messages);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(LLMResponse::text("default answer")))
        }

        fn get_default_model(&self) -> String {
            "scripted".to_string()
        }
    }

    struct LocationTool;

    #[async_trait]
    impl Tool for LocationTool {
        fn name(&self) -> &str {
            "getWeather"
        }

        fn description(&self) -> &str {
            "weather"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"location": {"type": "string"}}, "required": ["location"]})
        }

        async fn execute(&self, args: Value) -> parley_tools::base::Result<String> {
            match args["location"].as_str() {
                Some("Atlantis") => Err(ToolError::ExecutionFailed("unknown place".to_string())),
                Some(location) => Ok(format!("sunny in {}", location)),
                None => Err(ToolError::InvalidParams("location".to_string())),
            }
        }
    }

    fn tool_call(location: &str) -> LLMResponse {
        LLMResponse {
            content: None,
            tool_calls: vec![ToolCallRequest {
                id: "call_1".to_string(),
                name: "getWeather".to_string(),
                arguments: HashMap::from([("location".to_string(), json!(location))]),
            }],
            finish_reason: "stop".to_string(),
            usage: HashMap::new(),
        }
    }

    fn agent_with(provider: Arc<ScriptedProvider>, config: AgentConfig) -> AgentLoop {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(LocationTool));
        let sessions = Arc::new(SessionStore::with_limit(10, TrimMode::Messages));
        AgentLoop::new(provider, tools, sessions, &config)
    }

    fn agent(provider: Arc<ScriptedProvider>) -> AgentLoop {
        agent_with(provider, AgentConfig::default())
    }

    #[tokio::test]
    async fn test_exchange_is_recorded_and_replayed() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(LLMResponse::text("Hello!")),
            Ok(LLMResponse::text("You said hi.")),
        ]));
        let agent = agent(provider.clone());

        assert_eq!(agent.handle_chat("hi", "s1").await.unwrap(), "Hello!");
        assert_eq!(agent.handle_chat("what did I say?", "s1").await.unwrap(), "You said hi.");

        let second = &provider.requests()[1];
        let contents: Vec<_> = second.iter().map(|m| (m.role.as_str(), m.content.as_str())).collect();
        assert_eq!(
            contents,
            vec![
                ("system", crate::context::SYSTEM_PROMPT),
                ("user", "hi"),
                ("assistant", "Hello!"),
                ("user", "what did I say?")
            ]
        );
        assert_eq!(agent.sessions().get("s1").len(), 4);
    }

    #[tokio::test]
    async fn test_stateless_without_session_id() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(LLMResponse::text("ok"))]));
        let agent = agent(provider);

        assert_eq!(agent.handle_chat("hi", "").await.unwrap(), "ok");
        assert_eq!(agent.sessions().session_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_history_untouched() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(LLMResponse::text("first")),
            Err(ProviderError::ApiError("HTTP 503".to_string())),
        ]));
        let agent = agent(provider);

        agent.handle_chat("q1", "s1").await.unwrap();
        let err = agent.handle_chat("q2", "s1").await.unwrap_err();

        assert!(matches!(err, AgentError::Provider(_)));
        let history = agent.sessions().get("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "q1");
    }

    #[tokio::test]
    async fn test_tool_round_feeds_result_back() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(tool_call("Paris")),
            Ok(LLMResponse::text("It is sunny in Paris.")),
        ]));
        let agent = agent(provider.clone());

        let answer = agent.handle_chat("weather in Paris?", "s1").await.unwrap();
        assert_eq!(answer, "It is sunny in Paris.");

        let second = &provider.requests()[1];
        let assistant = &second[2];
        assert_eq!(assistant.role, "assistant");
        assert_eq!(assistant.tool_calls.as_ref().unwrap()[0].name, "getWeather");
        let tool_result = &second[3];
        assert_eq!(tool_result.role, "tool");
        assert_eq!(tool_result.content, "sunny in Paris");

        let history = agent.sessions().get("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "It is sunny in Paris.");
    }

    #[tokio::test]
    async fn test_failing_tool_still_completes() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(tool_call("Atlantis")),
            Ok(LLMResponse::text("I could not find that place.")),
        ]));
        let agent = agent(provider.clone());

        let answer = agent.handle_chat("weather in Atlantis?", "s1").await.unwrap();
        assert_eq!(answer, "I could not find that place.");

        let tool_result = &provider.requests()[1][3];
        assert!(tool_result.content.starts_with("Error executing getWeather"));
    }

    #[tokio::test]
    async fn test_iteration_limit_uses_fallback_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(tool_call("Paris")),
            Ok(tool_call("Paris")),
        ]));
        let config = AgentConfig {
            max_tool_iterations: 2,
            ..AgentConfig::default()
        };
        let agent = agent_with(provider.clone(), config);

        let answer = agent.handle_chat("loop", "s1").await.unwrap();
        assert_eq!(answer, FALLBACK_ANSWER);
        assert_eq!(provider.requests().len(), 2);
        assert!(agent.sessions().get("s1").is_empty());
    }

    #[tokio::test]
    async fn test_empty_model_answer_is_not_recorded() {
        let empty = LLMResponse {
            content: None,
            tool_calls: Vec::new(),
            finish_reason: "max_tokens".to_string(),
            usage: HashMap::new(),
        };
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(empty)]));
        let agent = agent(provider);

        let answer = agent.handle_chat("hi", "s1").await.unwrap();
        assert_eq!(answer, "");
        assert!(agent.sessions().get("s1").is_empty());
        assert_eq!(agent.sessions().session_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let provider = Arc::new(ScriptedProvider {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let mut agent = agent(provider);
        agent.request_timeout = Duration::from_millis(50);

        let err = agent.handle_chat("hi", "s1").await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(_)));
        assert!(agent.sessions().get("s1").is_empty());
    }
}
