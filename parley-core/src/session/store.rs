//! Bounded in-memory session history

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::config::schema::{TrimMode, DEFAULT_HISTORY_MAX_MESSAGES};

/// Author of a stored message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: Role,
    /// Message content
    pub content: String,
    /// Message timestamp
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// The retained history of one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session key as sent by the client
    pub key: String,
    /// Messages in chronological order
    pub messages: Vec<ChatMessage>,
    /// Session creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new, empty session
    pub fn new(key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record one exchange and cut the history back to `max_messages`
    pub fn add_exchange(
        &mut self,
        user: impl Into<String>,
        assistant: impl Into<String>,
        max_messages: usize,
        mode: TrimMode,
    ) {
        self.messages.push(ChatMessage::user(user));
        self.messages.push(ChatMessage::assistant(assistant));
        self.trim(max_messages, mode);
        self.updated_at = Utc::now();
    }

    fn trim(&mut self, max_messages: usize, mode: TrimMode) {
        let len = self.messages.len();
        if len <= max_messages {
            return;
        }

        let excess = len - max_messages;
        let drop = match mode {
            TrimMode::Messages => excess,
            // Round up to whole exchanges; exchanges always start on an even index
            TrimMode::Pairs => excess + excess % 2,
        };
        self.messages.drain(..drop.min(len));
    }
}

/// Process-wide map from session id to bounded history
///
/// A single lock guards the whole map, so every `append` (push plus trim) is
/// observed atomically by concurrent readers and writers.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    max_messages: usize,
    trim_mode: TrimMode,
}

impl SessionStore {
    /// Create a store with the default limit of 10 messages
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_MAX_MESSAGES, TrimMode::default())
    }

    /// Create a store with a custom limit; a zero limit falls back to the default
    pub fn with_limit(max_messages: usize, trim_mode: TrimMode) -> Self {
        let max_messages = if max_messages == 0 {
            DEFAULT_HISTORY_MAX_MESSAGES
        } else {
            max_messages
        };
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_messages,
            trim_mode,
        }
    }

    /// Current history for `session_id`, empty when unknown or blank
    pub fn get(&self, session_id: &str) -> Vec<ChatMessage> {
        if session_id.is_empty() {
            return Vec::new();
        }
        self.sessions
            .read()
            .get(session_id)
            .map(|session| session.messages.clone())
            .unwrap_or_default()
    }

    /// Record an exchange for `session_id`
    ///
    /// No-op when `session_id` or `assistant_message` is empty.
    pub fn append(&self, session_id: &str, user_message: &str, assistant_message: &str) {
        if session_id.is_empty() || assistant_message.is_empty() {
            return;
        }

        let mut sessions = self.sessions.write();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id))
            .add_exchange(
                user_message,
                assistant_message,
                self.max_messages,
                self.trim_mode,
            );
    }

    /// Maximum retained messages per session
    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn trim_mode(&self) -> TrimMode {
        self.trim_mode
    }

    /// Number of sessions that have recorded at least one exchange
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
