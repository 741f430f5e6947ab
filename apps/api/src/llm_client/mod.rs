/// LLM Client — the single boundary between this service and the remote
/// model/document service.
///
/// ARCHITECTURAL RULE: No other module may call the remote API directly.
/// Components receive an `LlmClient` built once in `main` and open
/// `ChatSession`s from it.
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

pub mod gemini;
pub mod types;

pub use types::{Content, CredentialScope, FileData, FileState, Part, RemoteFile, Role};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Unexpected response from remote service: {0}")]
    Protocol(String),

    #[error("Credential scope '{0}' is not configured")]
    ScopeNotConfigured(CredentialScope),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The remote model/document service, as seen by this crate.
///
/// `GeminiBackend` is the production implementation; tests substitute a
/// scripted backend.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Uploads the file at `path` under `scope` and returns the new handle.
    async fn upload_file(
        &self,
        scope: CredentialScope,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile, LlmError>;

    /// Looks up a handle by resource name. `Ok(None)` means the store does not know it.
    async fn get_file(
        &self,
        scope: CredentialScope,
        name: &str,
    ) -> Result<Option<RemoteFile>, LlmError>;

    /// Runs one generation over the full conversation and returns the reply text.
    async fn generate(
        &self,
        scope: CredentialScope,
        model: &str,
        contents: &[Content],
    ) -> Result<String, LlmError>;

    fn supports_scope(&self, scope: CredentialScope) -> bool;
}

/// Which model a session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    Baseline,
    /// Higher-capability model, used for the portfolio-tier and international tables.
    Advanced,
}

/// The client object injected into every component.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn GenerativeBackend>,
    baseline_model: String,
    advanced_model: String,
}

impl LlmClient {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        baseline_model: impl Into<String>,
        advanced_model: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            baseline_model: baseline_model.into(),
            advanced_model: advanced_model.into(),
        }
    }

    pub fn model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Baseline => &self.baseline_model,
            ModelTier::Advanced => &self.advanced_model,
        }
    }

    pub fn supports_scope(&self, scope: CredentialScope) -> bool {
        self.backend.supports_scope(scope)
    }

    pub async fn upload_file(
        &self,
        scope: CredentialScope,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile, LlmError> {
        if !self.backend.supports_scope(scope) {
            return Err(LlmError::ScopeNotConfigured(scope));
        }
        self.backend
            .upload_file(scope, path, mime_type, display_name)
            .await
    }

    pub async fn get_file(
        &self,
        scope: CredentialScope,
        name: &str,
    ) -> Result<Option<RemoteFile>, LlmError> {
        self.backend.get_file(scope, name).await
    }

    /// Opens a conversation whose prior turns are `history`.
    pub fn start_chat(
        &self,
        tier: ModelTier,
        scope: CredentialScope,
        history: Vec<Content>,
    ) -> ChatSession {
        ChatSession {
            backend: Arc::clone(&self.backend),
            scope,
            model: self.model(tier).to_string(),
            history,
        }
    }
}

/// An ordered conversation with one model. Owned by exactly one caller and
/// never shared across chains.
pub struct ChatSession {
    backend: Arc<dyn GenerativeBackend>,
    scope: CredentialScope,
    model: String,
    history: Vec<Content>,
}

impl ChatSession {
    /// Sends `prompt` as the next user turn and returns the reply text.
    /// The exchange is appended to the history only when the call succeeds.
    pub async fn send(&mut self, prompt: &str) -> Result<String, LlmError> {
        let mut contents = self.history.clone();
        contents.push(Content::user(prompt));

        let text = self
            .backend
            .generate(self.scope, &self.model, &contents)
            .await?;

        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }

        debug!(
            "Chat turn {} on {} returned {} chars",
            contents.len(),
            self.model,
            text.len()
        );

        contents.push(Content::model(text.clone()));
        self.history = contents;
        Ok(text)
    }

    /// Like `send`, then strips any code fence and deserializes the reply.
    pub async fn send_json<T: DeserializeOwned>(&mut self, prompt: &str) -> Result<T, LlmError> {
        let text = self.send(prompt).await?;
        parse_json_response(&text)
    }

    pub fn history(&self) -> &[Content] {
        &self.history
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Strips a code fence the model may wrap its JSON in, then deserializes it.
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    serde_json::from_str(strip_json_fences(text)).map_err(LlmError::Parse)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
