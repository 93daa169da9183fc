//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default model used when neither the config file nor `GEMINI_MODEL` names one
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
/// Default Gemini REST base
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default upper bound on generated tokens per model call
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 500;
/// Default number of retained history messages per session
pub const DEFAULT_HISTORY_MAX_MESSAGES: usize = 10;

/// Root configuration for parley
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Conversation orchestration settings
    #[serde(default)]
    pub agent: AgentConfig,
    /// Session history settings
    #[serde(default)]
    pub history: HistoryConfig,
    /// Tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Hosted model provider (Gemini)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_api_base() -> String {
    DEFAULT_GEMINI_API_BASE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            model: default_model(),
        }
    }
}

/// Conversation orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum output tokens for every model call, tools included
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum model rounds that may request tool calls in one exchange
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,
    /// Deadline applied to each provider call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_max_output_tokens() -> u32 {
    DEFAULT_MAX_OUTPUT_TOKENS
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tool_iterations() -> u32 {
    5
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            max_tool_iterations: default_max_tool_iterations(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// How a session history is cut back once it exceeds its limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrimMode {
    /// Drop single messages from the front; the kept window may start with
    /// an assistant reply when the limit is odd
    #[default]
    Messages,
    /// Drop whole user/assistant exchanges from the front
    Pairs,
}

/// Session history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_max_messages")]
    pub max_messages: usize,
    #[serde(default)]
    pub trim_mode: TrimMode,
}

fn default_history_max_messages() -> usize {
    DEFAULT_HISTORY_MAX_MESSAGES
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_messages: default_history_max_messages(),
            trim_mode: TrimMode::default(),
        }
    }
}

/// Tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Timeout for the HTTP client shared by third-party API tools
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_agify_base")]
    pub agify_base: String,
    #[serde(default = "default_genderize_base")]
    pub genderize_base: String,
}

fn default_http_timeout() -> u64 {
    10
}

fn default_agify_base() -> String {
    "https://api.agify.io".to_string()
}

fn default_genderize_base() -> String {
    "https://api.genderize.io".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            agify_base: default_agify_base(),
            genderize_base: default_genderize_base(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Chat page served at `/`; the built-in page is used when missing
    #[serde(default = "default_chat_page")]
    pub chat_page: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3400
}

fn default_chat_page() -> String {
    "chat.html".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            chat_page: default_chat_page(),
        }
    }
}
