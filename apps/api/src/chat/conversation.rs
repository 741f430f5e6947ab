//! Replays a client-held conversation against an uploaded contract.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chat::prompts::CHAT_CONTEXT_PROMPT;
use crate::errors::AppError;
use crate::llm_client::{Content, LlmClient, ModelTier, RemoteFile, Role};

/// One prior turn as the client sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Converts client turns to model contents, rejecting unknown roles.
pub fn history_contents(history: &[ChatMessage]) -> Result<Vec<Content>, AppError> {
    history
        .iter()
        .enumerate()
        .map(|(i, turn)| {
            Role::parse(&turn.role)
                .map(|role| Content::text(role, turn.content.clone()))
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "chat_history[{i}].role must be 'user' or 'model', got '{}'",
                        turn.role
                    ))
                })
        })
        .collect()
}

/// Seeds a baseline session with the document, replays `history`, sends `message`.
pub async fn converse(
    llm: &LlmClient,
    document: &RemoteFile,
    message: &str,
    history: &[ChatMessage],
) -> Result<String, AppError> {
    let mut seeded = vec![Content::user_with_document(document, CHAT_CONTEXT_PROMPT)];
    seeded.extend(history_contents(history)?);

    debug!(
        "Chat on {} replaying {} prior turns",
        document.name,
        history.len()
    );

    let mut session = llm.start_chat(ModelTier::Baseline, document.scope, seeded);
    let reply = session
        .send(message)
        .await
        .map_err(|e| AppError::from(e).context("chat"))?;

    info!("Chat reply on {} ({} chars)", document.name, reply.len());
    Ok(reply)
}
