//! Axum route handler for the chat API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::chat::conversation::{converse, ChatMessage};
use crate::documents::readiness::wait_until_active_in_any_scope;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(rename = "fileName", default)]
    pub file_name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// POST /api/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.file_name.trim().is_empty() || request.message.trim().is_empty() {
        return Err(AppError::Validation(
            "fileName and message are required".to_string(),
        ));
    }

    let document = wait_until_active_in_any_scope(
        &state.llm,
        request.file_name.trim(),
        state.config.poll_policy(),
    )
    .await?;

    let response = converse(&state.llm, &document, &request.message, &request.chat_history).await?;

    Ok(Json(ChatResponse { response }))
}
