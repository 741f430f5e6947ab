//! `GenerativeBackend` over the Gemini REST API.
//!
//! Uploads use the resumable protocol (start, then upload+finalize). Keys are
//! sent in the `x-goog-api-key` header so they never appear in request URLs
//! or in `reqwest` error messages.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::fs;
use tracing::{debug, info, warn};

use super::{Content, CredentialScope, GenerativeBackend, LlmError, RemoteFile};
use crate::config::Config;

const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String, LlmError> {
        let content = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or(LlmError::EmptyContent)?;

        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    primary_key: String,
    alternate_key: Option<String>,
    base_url: String,
    upload_url: String,
    generation: GenerationConfig,
}

impl GeminiBackend {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            primary_key: config.api_key.clone(),
            alternate_key: config.alternate_api_key.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            upload_url: config.gemini_upload_url.clone(),
            generation: GenerationConfig::default(),
        })
    }

    fn key(&self, scope: CredentialScope) -> Result<&str, LlmError> {
        match scope {
            CredentialScope::Primary => Ok(&self.primary_key),
            CredentialScope::Alternate => self
                .alternate_key
                .as_deref()
                .ok_or(LlmError::ScopeNotConfigured(scope)),
        }
    }

    /// Sends the request built by `build`, retrying on 429 with exponential backoff.
    /// Any other failure is returned to the caller unchanged.
    async fn send_with_rate_limit_retry<F>(&self, build: F) -> Result<Response, LlmError>
    where
        F: Fn() -> RequestBuilder,
    {
        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Gemini rate limited (attempt {}), retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = build().send().await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }
        }

        Err(LlmError::RateLimited {
            retries: MAX_RETRIES,
        })
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn upload_file(
        &self,
        scope: CredentialScope,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile, LlmError> {
        let key = self.key(scope)?;
        let file_bytes = fs::read(path).await?;
        let file_size = file_bytes.len();
        let metadata = json!({ "file": { "display_name": display_name } });

        let init_res = self
            .send_with_rate_limit_retry(|| {
                self.client
                    .post(&self.upload_url)
                    .header(API_KEY_HEADER, key)
                    .header("X-Goog-Upload-Protocol", "resumable")
                    .header("X-Goog-Upload-Command", "start")
                    .header("X-Goog-Upload-Header-Content-Length", file_size.to_string())
                    .header("X-Goog-Upload-Header-Content-Type", mime_type)
                    .json(&metadata)
            })
            .await?;
        let init_res = ensure_success(init_res).await?;

        let upload_url = init_res
            .headers()
            .get("x-goog-upload-url")
            .ok_or_else(|| LlmError::Protocol("No upload URL in headers".to_string()))?
            .to_str()
            .map_err(|e| LlmError::Protocol(e.to_string()))?
            .to_string();

        let upload_res = self
            .client
            .post(&upload_url)
            .header("Content-Length", file_size.to_string())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(file_bytes)
            .send()
            .await?;
        let upload_res = ensure_success(upload_res).await?;

        let mut file = upload_res.json::<UploadResponse>().await?.file;
        file.scope = scope;

        info!(
            "Uploaded '{}' as {} ({} scope, state {:?})",
            display_name, file.name, scope, file.state
        );
        Ok(file)
    }

    async fn get_file(
        &self,
        scope: CredentialScope,
        name: &str,
    ) -> Result<Option<RemoteFile>, LlmError> {
        let key = self.key(scope)?;
        let url = format!("{}/{}", self.base_url, file_resource_name(name));

        let response = self
            .send_with_rate_limit_retry(|| self.client.get(&url).header(API_KEY_HEADER, key))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("File {name} not found under {scope} scope");
            return Ok(None);
        }

        let mut file = ensure_success(response).await?.json::<RemoteFile>().await?;
        file.scope = scope;
        Ok(Some(file))
    }

    async fn generate(
        &self,
        scope: CredentialScope,
        model: &str,
        contents: &[Content],
    ) -> Result<String, LlmError> {
        let key = self.key(scope)?;
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let payload = GenerateContentRequest {
            contents,
            generation_config: &self.generation,
        };

        let response = self
            .send_with_rate_limit_retry(|| {
                self.client
                    .post(&url)
                    .header(API_KEY_HEADER, key)
                    .json(&payload)
            })
            .await?;

        let body: GenerateContentResponse = ensure_success(response).await?.json().await?;
        body.into_text()
    }

    fn supports_scope(&self, scope: CredentialScope) -> bool {
        match scope {
            CredentialScope::Primary => true,
            CredentialScope::Alternate => self.alternate_key.is_some(),
        }
    }
}

/// Accepts both `abc123` and `files/abc123`.
fn file_resource_name(name: &str) -> String {
    let name = name.trim().trim_start_matches('/');
    if name.starts_with("files/") {
        name.to_string()
    } else {
        format!("files/{name}")
    }
}

async fn ensure_success(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LlmError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<GeminiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_resource_name_adds_prefix() {
        assert_eq!(file_resource_name("abc123"), "files/abc123");
        assert_eq!(file_resource_name("files/abc123"), "files/abc123");
        assert_eq!(file_resource_name("/files/abc123"), "files/abc123");
    }

    #[test]
    fn test_error_message_prefers_structured_body() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid.");
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn test_generate_response_text_joins_parts() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "```json\n{"}, {"text": "}\n```"}]},
                "finishReason": "STOP"
            }]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_text().unwrap(), "```json\n{}\n```");
    }

    #[test]
    fn test_generate_response_without_candidates_is_empty() {
        let parsed: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(matches!(parsed.into_text(), Err(LlmError::EmptyContent)));
    }

    #[test]
    fn test_generation_config_wire_names() {
        let value = serde_json::to_value(GenerationConfig::default()).unwrap();
        assert_eq!(value["topK"], 40);
        assert_eq!(value["maxOutputTokens"], 8192);
    }
}
