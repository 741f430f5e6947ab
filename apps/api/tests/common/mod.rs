//! Shared harness: a scripted in-memory backend plus request helpers.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;

use contract_discounts_api::discounts::templates::TableId;
use contract_discounts_api::llm_client::{
    Content, CredentialScope, FileState, GenerativeBackend, LlmClient, LlmError, Part, RemoteFile,
};
use contract_discounts_api::{build_router, AppState, Config};

pub const BASELINE_MODEL: &str = "stub-flash";
pub const ADVANCED_MODEL: &str = "stub-pro";
pub const BOUNDARY: &str = "contract-test-boundary";

/// Marker in the band query the resolver sends.
const BAND_QUERY_MARKER: &str = "EXACT_RANGE_FOUND";

#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub scope: CredentialScope,
    pub name: String,
    pub path: PathBuf,
    pub existed: bool,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct GenerateRecord {
    pub scope: CredentialScope,
    pub model: String,
    pub contents: Vec<Content>,
}

impl GenerateRecord {
    /// Text of the newest user turn.
    pub fn prompt(&self) -> String {
        self.contents
            .last()
            .map(Content::joined_text)
            .unwrap_or_default()
    }

    pub fn table(&self) -> Option<TableId> {
        table_for_prompt(&self.prompt())
    }

    pub fn references_file(&self, name: &str) -> bool {
        self.contents.iter().flat_map(|c| c.parts.iter()).any(|p| match p {
            Part::FileData { file_data } => file_data.file_uri.ends_with(name),
            Part::Text { .. } => false,
        })
    }
}

/// Scripted stand-in for the remote model/document service.
///
/// A file is visible only under the scope it was uploaded through. Names the
/// stub never uploaded are treated as pre-existing primary-scope files.
pub struct StubBackend {
    /// Band rows as `(low, high, label)`; the last row is returned for overflow.
    pub bands: Vec<(f64, f64, String)>,
    /// Verbatim reply to the band query, replacing the table lookup.
    pub band_reply: Option<String>,
    pub alternate_scope: bool,
    pub fail_table: Option<TableId>,
    pub fail_upload: bool,
    pub missing_files: bool,
    pub chat_reply: String,
    pub states: Mutex<VecDeque<FileState>>,
    pub uploads: Mutex<Vec<UploadRecord>>,
    pub calls: Mutex<Vec<GenerateRecord>>,
    pub lookups: Mutex<u32>,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self {
            bands: vec![
                (0.0, 19_429.99, "0.01 - 19,429.99".to_string()),
                (19_430.0, 37_779.99, "19,430.00 - 37,779.99".to_string()),
                (37_780.0, 43_174.99, "37,780.00 - 43,174.99".to_string()),
                (43_175.0, f64::MAX, "43,175.00 and above".to_string()),
            ],
            band_reply: None,
            alternate_scope: true,
            fail_table: None,
            fail_upload: false,
            missing_files: false,
            chat_reply: "The contract runs for 52 weeks.".to_string(),
            states: Mutex::new(VecDeque::new()),
            uploads: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            lookups: Mutex::new(0),
        }
    }
}

impl StubBackend {
    /// States returned by successive lookups; once drained every lookup is ACTIVE.
    pub fn with_states(self, states: &[FileState]) -> Self {
        *self.states.lock().unwrap() = states.iter().copied().collect();
        self
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<GenerateRecord> {
        self.calls.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> u32 {
        *self.lookups.lock().unwrap()
    }

    /// Whether `name` can be looked up under `scope`.
    fn visible(&self, scope: CredentialScope, name: &str) -> bool {
        let uploads = self.uploads.lock().unwrap();
        match uploads.iter().find(|u| u.name == name) {
            Some(upload) => upload.scope == scope,
            None => scope == CredentialScope::Primary,
        }
    }

    fn band_for(&self, charge: f64) -> String {
        self.bands
            .iter()
            .find(|(low, high, _)| *low <= charge && charge <= *high)
            .or_else(|| self.bands.last())
            .map(|(_, _, label)| label.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeBackend for StubBackend {
    async fn upload_file(
        &self,
        scope: CredentialScope,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile, LlmError> {
        let name = format!("files/{}", uuid::Uuid::new_v4().simple());
        self.uploads.lock().unwrap().push(UploadRecord {
            scope,
            name: name.clone(),
            path: path.to_path_buf(),
            existed: path.exists(),
            display_name: display_name.to_string(),
        });
        if self.fail_upload {
            return Err(LlmError::Api {
                status: 503,
                message: "file store unavailable".to_string(),
            });
        }
        Ok(RemoteFile {
            uri: format!("https://stub.invalid/v1beta/{name}"),
            name,
            mime_type: mime_type.to_string(),
            display_name: Some(display_name.to_string()),
            state: FileState::Processing,
            expiration_time: None,
            scope,
        })
    }

    async fn get_file(
        &self,
        scope: CredentialScope,
        name: &str,
    ) -> Result<Option<RemoteFile>, LlmError> {
        *self.lookups.lock().unwrap() += 1;
        if self.missing_files || !self.visible(scope, name) {
            return Ok(None);
        }
        let state = self
            .states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FileState::Active);
        Ok(Some(RemoteFile {
            name: name.to_string(),
            uri: format!("https://stub.invalid/v1beta/{name}"),
            mime_type: "application/pdf".to_string(),
            display_name: None,
            state,
            expiration_time: None,
            scope,
        }))
    }

    async fn generate(
        &self,
        scope: CredentialScope,
        model: &str,
        contents: &[Content],
    ) -> Result<String, LlmError> {
        let record = GenerateRecord {
            scope,
            model: model.to_string(),
            contents: contents.to_vec(),
        };
        let prompt = record.prompt();
        self.calls.lock().unwrap().push(record);

        if prompt.contains(BAND_QUERY_MARKER) {
            if let Some(reply) = &self.band_reply {
                return Ok(reply.clone());
            }
            let charge = charge_in_band_query(&prompt).unwrap_or(0.0);
            return Ok(format!(
                "```json\n{{\"weeklyChargesBand\": \"{}\"}}\n```",
                self.band_for(charge)
            ));
        }

        match table_for_prompt(&prompt) {
            Some(table) if Some(table) == self.fail_table => {
                Ok("```json\n{\"Domestic Air Service Level\": \n```".to_string())
            }
            Some(table) => {
                let mut value: Value = serde_json::from_str(table.skeleton())?;
                fill_blanks(&mut value, &sentinel(table, model));
                Ok(format!("```json\n{}\n```", serde_json::to_string_pretty(&value)?))
            }
            None => Ok(self.chat_reply.clone()),
        }
    }

    fn supports_scope(&self, scope: CredentialScope) -> bool {
        match scope {
            CredentialScope::Primary => true,
            CredentialScope::Alternate => self.alternate_scope,
        }
    }
}

/// Value the stub writes into every blank cell of `table`.
pub fn sentinel(table: TableId, model: &str) -> String {
    format!("{}|{}", table.key(), model)
}

/// Extraction prompts end with the table skeleton, which is unique per table.
pub fn table_for_prompt(prompt: &str) -> Option<TableId> {
    TableId::ALL
        .iter()
        .copied()
        .find(|table| prompt.trim_end().ends_with(table.skeleton().trim_end()))
}

fn charge_in_band_query(prompt: &str) -> Option<f64> {
    let start = prompt.find("where *")? + "where *".len();
    let end = start + prompt[start..].find('*')?;
    prompt[start..end].replace([',', '$'], "").trim().parse().ok()
}

fn fill_blanks(value: &mut Value, fill: &str) {
    match value {
        Value::String(s) if s.is_empty() => *s = fill.to_string(),
        Value::Array(items) => items.iter_mut().for_each(|v| fill_blanks(v, fill)),
        Value::Object(map) => map.values_mut().for_each(|v| fill_blanks(v, fill)),
        _ => {}
    }
}

/// Collects every string leaf of `value`.
pub fn string_leaves(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(string_leaves).collect(),
        Value::Object(map) => map.values().flat_map(string_leaves).collect(),
        _ => Vec::new(),
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| {
        match key {
            "API_KEY" => Some("test-key"),
            "GEMINI_MODEL" => Some(BASELINE_MODEL),
            "GEMINI_PRO_MODEL" => Some(ADVANCED_MODEL),
            "FILE_POLL_INTERVAL_SECS" => Some("0"),
            "FILE_POLL_MAX_ATTEMPTS" => Some("5"),
            _ => None,
        }
        .map(str::to_string)
    })
    .unwrap()
}

pub fn test_client(stub: &Arc<StubBackend>) -> LlmClient {
    let backend: Arc<dyn GenerativeBackend> = stub.clone();
    LlmClient::new(backend, BASELINE_MODEL, ADVANCED_MODEL)
}

pub fn test_app(stub: &Arc<StubBackend>) -> Router {
    build_router(AppState::new(test_client(stub), test_config()))
}

/// A part of a hand-built multipart body.
pub struct FormPart<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> FormPart<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }

    pub fn file(file_name: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name: "file",
            file_name: Some(file_name),
            content_type: Some(content_type),
            data,
        }
    }
}

pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\ntrailer << >>\n%%EOF\n";

pub fn multipart_request(uri: &str, parts: &[FormPart<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(file_name) = part.file_name {
            disposition.push_str(&format!("; filename=\"{file_name}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn contract_upload(uri: &str, band: &str) -> Request<Body> {
    multipart_request(
        uri,
        &[
            FormPart::file("contract.pdf", "application/pdf", PDF_BYTES),
            FormPart::text("weeklyChargesBand", band),
        ],
    )
}

pub fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
