use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Served when no chat page exists on disk
const EMBEDDED_CHAT_PAGE: &str = include_str!("../static/chat.html");

const GENERATION_FAILED: &str = "LLM generation failed";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub data: ChatInput,
}

#[derive(Debug, Deserialize)]
pub struct ChatInput {
    pub question: String,
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub result: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ErrorResponse {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                status: "INTERNAL",
                message: message.into(),
            },
        }
    }
}

pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Response {
    let ChatInput {
        question,
        session_id,
    } = payload.data;
    let session_id = session_id.unwrap_or_default();

    match state.agent.handle_chat(&question, &session_id).await {
        Ok(result) => Json(ChatResponse { result }).into_response(),
        Err(e) => {
            tracing::error!("Chat failed for session '{}': {}", session_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal(GENERATION_FAILED)),
            )
                .into_response()
        }
    }
}

pub async fn index_handler(State(state): State<AppState>) -> Html<String> {
    match tokio::fs::read_to_string(&state.chat_page).await {
        Ok(page) => Html(page),
        Err(e) => {
            tracing::debug!(
                "Serving embedded chat page ({}: {})",
                state.chat_page.display(),
                e
            );
            Html(EMBEDDED_CHAT_PAGE.to_string())
        }
    }
}
