use parley_agent::AgentLoop;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AgentLoop>,
    /// Chat UI served at `/` when the file exists
    pub chat_page: PathBuf,
}

impl AppState {
    pub fn new(agent: Arc<AgentLoop>, chat_page: impl Into<PathBuf>) -> Self {
        Self {
            agent,
            chat_page: chat_page.into(),
        }
    }
}
