//! Google Gemini client for the Generative Language REST API

use async_trait::async_trait;
use parley_core::config::{ProviderConfig, DEFAULT_GEMINI_API_BASE};
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::base::{
    LLMProvider, LLMResponse, Message, ProviderError, ProviderResult, ToolCallRequest,
};

/// Gemini provider client
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
    default_model: String,
}

impl GeminiClient {
    /// Create a new Gemini client; an empty `api_base` selects the public endpoint
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: impl Into<String>,
    ) -> Self {
        let api_base = api_base
            .filter(|base| !base.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string());

        Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            default_model: default_model.into(),
        }
    }

    /// Build a client from configuration, failing when no API key is set
    pub fn from_config(config: &ProviderConfig) -> ProviderResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::ConfigError(
                "GEMINI_API_KEY (provider.api_key) is not set".to_string(),
            ));
        }
        Ok(Self::new(
            config.api_key.clone(),
            Some(config.api_base.clone()),
            config.model.clone(),
        ))
    }

    /// Strip plugin or resource prefixes such as `googleai/` or `models/`
    fn resolve_model(model: &str) -> &str {
        model.rsplit('/').next().unwrap_or(model)
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base,
            Self::resolve_model(model)
        )
    }

    /// Build the JSON request body for the Gemini API
    fn build_request(
        messages: &[Message],
        tools: Option<&[Value]>,
        max_tokens: i32,
        temperature: f64,
        response_schema: Option<Value>,
    ) -> Value {
        let mut system_parts = Vec::new();
        let mut contents: Vec<Value> = Vec::new();
        let mut last_was_tool = false;

        for msg in messages {
            match msg.role.as_str() {
                "system" => {
                    system_parts.push(json!({ "text": msg.content }));
                    continue;
                }
                "tool" => {
                    let part = json!({
                        "functionResponse": {
                            "name": msg.name.clone().unwrap_or_default(),
                            "response": { "result": msg.content },
                        }
                    });
                    // All responses to one model turn go back in a single content
                    if last_was_tool {
                        if let Some(parts) = contents
                            .last_mut()
                            .and_then(|c| c.get_mut("parts"))
                            .and_then(Value::as_array_mut)
                        {
                            parts.push(part);
                            continue;
                        }
                    }
                    contents.push(json!({ "role": "user", "parts": [part] }));
                    last_was_tool = true;
                    continue;
                }
                "assistant" => {
                    let mut parts = Vec::new();
                    if !msg.content.is_empty() {
                        parts.push(json!({ "text": msg.content }));
                    }
                    for call in msg.tool_calls.iter().flatten() {
                        parts.push(json!({
                            "functionCall": { "name": call.name, "args": call.arguments }
                        }));
                    }
                    if !parts.is_empty() {
                        contents.push(json!({ "role": "model", "parts": parts }));
                    }
                }
                _ => {
                    contents.push(json!({ "role": "user", "parts": [{ "text": msg.content }] }));
                }
            }
            last_was_tool = false;
        }

        let mut generation_config = json!({
            "maxOutputTokens": max_tokens,
            "temperature": temperature,
        });
        if let Some(schema) = response_schema {
            generation_config["responseMimeType"] = json!("application/json");
            generation_config["responseSchema"] = schema;
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation_config,
        });

        if !system_parts.is_empty() {
            body["systemInstruction"] = json!({ "parts": system_parts });
        }

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            let declarations: Vec<Value> = tools.iter().map(to_function_declaration).collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        body
    }

    /// Parse a Gemini response into our standard format
    fn parse_response(data: Value) -> ProviderResult<LLMResponse> {
        let Some(candidate) = data
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
        else {
            let reason = data
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .unwrap_or("no candidates in response");
            return Err(ProviderError::InvalidResponse(reason.to_string()));
        };

        let mut content = String::new();
        let mut tool_calls = Vec::new();

        let parts = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for part in &parts {
            if part.get("thought").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                content.push_str(text);
            }
            if let Some(call) = part.get("functionCall") {
                let name = call
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let arguments = match call.get("args") {
                    Some(Value::Object(map)) => map.clone().into_iter().collect(),
                    Some(Value::Null) | None => HashMap::new(),
                    Some(other) => {
                        warn!("Unexpected functionCall args for {}: {}", name, other);
                        HashMap::new()
                    }
                };
                tool_calls.push(ToolCallRequest {
                    id: uuid::Uuid::new_v4().to_string(),
                    name,
                    arguments,
                });
            }
        }

        let finish_reason = candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "stop".to_string());

        let mut usage = HashMap::new();
        if let Some(meta) = data.get("usageMetadata").and_then(Value::as_object) {
            for (field, key) in [
                ("promptTokenCount", "prompt_tokens"),
                ("candidatesTokenCount", "completion_tokens"),
                ("totalTokenCount", "total_tokens"),
            ] {
                if let Some(count) = meta.get(field).and_then(Value::as_i64) {
                    usage.insert(key.to_string(), count);
                }
            }
        }

        Ok(LLMResponse {
            content: if content.is_empty() { None } else { Some(content) },
            tool_calls,
            finish_reason,
            usage,
        })
    }

    async fn send(&self, model: &str, body: &Value) -> ProviderResult<LLMResponse> {
        let url = self.endpoint(model);
        debug!("Sending generateContent request for model {}", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let data: Value = response.json().await?;
        Self::parse_response(data)
    }
}

#[async_trait]
impl LLMProvider for GeminiClient {
    async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<Value>>,
        model: Option<String>,
        max_tokens: i32,
        temperature: f64,
    ) -> ProviderResult<LLMResponse> {
        let model = model.unwrap_or_else(|| self.default_model.clone());
        let body = Self::build_request(&messages, tools.as_deref(), max_tokens, temperature, None);
        self.send(&model, &body).await
    }

    async fn chat_structured(
        &self,
        messages: Vec<Message>,
        schema: Value,
        model: Option<String>,
        max_tokens: i32,
        temperature: f64,
    ) -> ProviderResult<LLMResponse> {
        let model = model.unwrap_or_else(|| self.default_model.clone());
        let body = Self::build_request(&messages, None, max_tokens, temperature, Some(schema));
        self.send(&model, &body).await
    }

    fn get_default_model(&self) -> String {
        self.default_model.clone()
    }
}

/// Convert a `{"name", "description", "parameters"}` map into a function
/// declaration, dropping JSON-schema keys Gemini rejects
pub fn to_function_declaration(definition: &Value) -> Value {
    fn strip(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let cleaned: Map<String, Value> = map
                    .iter()
                    .filter(|(k, _)| !matches!(k.as_str(), "$schema" | "additionalProperties"))
                    .map(|(k, v)| (k.clone(), strip(v)))
                    .collect();
                Value::Object(cleaned)
            }
            Value::Array(items) => Value::Array(items.iter().map(strip).collect()),
            other => other.clone(),
        }
    }
    strip(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_resolve_model() {
        assert_eq!(GeminiClient::resolve_model("gemini-2.0-flash"), "gemini-2.0-flash");
        assert_eq!(GeminiClient::resolve_model("googleai/gemini-2.5-flash"), "gemini-2.5-flash");
        assert_eq!(GeminiClient::resolve_model("models/gemini-pro"), "gemini-pro");
    }

    #[test]
    fn test_blank_api_base_uses_public_endpoint() {
        let client = GeminiClient::new("k", None, "m");
        assert_eq!(client.api_base, DEFAULT_GEMINI_API_BASE);

        let client = GeminiClient::new("k", Some("  ".to_string()), "m");
        assert_eq!(client.api_base, DEFAULT_GEMINI_API_BASE);

        let client = GeminiClient::from_config(&ProviderConfig {
            api_key: "k".to_string(),
            ..ProviderConfig::default()
        })
        .unwrap();
        assert_eq!(client.api_base, DEFAULT_GEMINI_API_BASE);

        let client = GeminiClient::new("k", Some("http://localhost:9/".to_string()), "m");
        assert_eq!(client.api_base, "http://localhost:9");
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = ProviderConfig::default();
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(ProviderError::ConfigError(_))
        ));
    }

    #[test]
    fn test_build_request_maps_roles_and_tools() {
        let messages = vec![
            Message::system("be brief"),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("how old is Ana?"),
        ];
        let tools = vec![json!({
            "name": "guessAge",
            "description": "Guesses age",
            "parameters": {"type": "object", "properties": {"name": {"type": "string"}}}
        })];

        let body = GeminiClient::build_request(&messages, Some(tools.as_slice()), 500, 0.7, None);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 500);
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "guessAge");
    }

    #[test]
    fn test_build_request_groups_function_responses() {
        let call_a = ToolCallRequest {
            id: "a".to_string(),
            name: "guessAge".to_string(),
            arguments: HashMap::from([("name".to_string(), json!("Ana"))]),
        };
        let call_b = ToolCallRequest {
            id: "b".to_string(),
            name: "guessGender".to_string(),
            arguments: HashMap::from([("name".to_string(), json!("Ana"))]),
        };
        let mut assistant = Message::assistant("");
        assistant.tool_calls = Some(vec![call_a, call_b]);

        let messages = vec![
            Message::user("tell me about Ana"),
            assistant,
            Message::tool("31", "a", "guessAge"),
            Message::tool("female (with probability 0.98)", "b", "guessGender"),
        ];

        let body = GeminiClient::build_request(&messages, None, 500, 0.7, None);
        let contents = body["contents"].as_array().unwrap();

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["parts"].as_array().unwrap().len(), 2);
        assert_eq!(contents[1]["parts"][0]["functionCall"]["args"]["name"], "Ana");
        let responses = contents[2]["parts"].as_array().unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["functionResponse"]["name"], "guessAge");
        assert_eq!(responses[1]["functionResponse"]["response"]["result"], "female (with probability 0.98)");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_parse_response_text_and_calls() {
        let data = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "Let me check. "},
                    {"functionCall": {"name": "getWeather", "args": {"location": "Paris"}}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17}
        });

        let response = GeminiClient::parse_response(data).unwrap();
        assert_eq!(response.content.as_deref(), Some("Let me check. "));
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "getWeather");
        assert_eq!(response.tool_calls[0].arguments["location"], "Paris");
        assert_eq!(response.finish_reason, "stop");
        assert_eq!(response.usage["total_tokens"], 17);
    }

    #[test]
    fn test_parse_response_blocked_prompt() {
        let data = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = GeminiClient::parse_response(data).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_function_declaration_strips_unsupported_keys() {
        let decl = to_function_declaration(&json!({
            "name": "x",
            "parameters": {"type": "object", "additionalProperties": false, "properties": {}}
        }));
        assert!(decl["parameters"].get("additionalProperties").is_none());
    }

    #[tokio::test]
    async fn test_chat_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": {"maxOutputTokens": 500}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{"content": {"parts": [{"text": "Hello there"}]}, "finishReason": "STOP"}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = GeminiClient::new("test-key", Some(server.url()), "gemini-test");
        let response = client
            .chat(vec![Message::user("hi")], None, None, 500, 0.7)
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("Hello there"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_structured_sets_json_mime_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .with_status(200)
            .with_body(
                json!({"candidates": [{"content": {"parts": [{"text": "{\"ok\":true}"}]}}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = GeminiClient::new("test-key", Some(server.url()), "gemini-test");
        let response = client
            .chat_structured(vec![Message::user("json please")], json!({"type": "OBJECT"}), None, 100, 0.2)
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("{\"ok\":true}"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_maps_error_statuses() {
        let mut server = mockito::Server::new_async().await;
        let _limited = server
            .mock("POST", "/models/limited:generateContent")
            .with_status(429)
            .create_async()
            .await;
        let _broken = server
            .mock("POST", "/models/broken:generateContent")
            .with_status(400)
            .with_body("bad request")
            .create_async()
            .await;

        let client = GeminiClient::new("test-key", Some(server.url()), "limited");
        let err = client
            .chat(vec![Message::user("hi")], None, None, 10, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited));

        let err = client
            .chat(vec![Message::user("hi")], None, Some("broken".to_string()), 10, 0.0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("400"));
    }
}
