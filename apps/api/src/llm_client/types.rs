//! Wire and domain types shared by every `GenerativeBackend`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The credential a remote call is made under. Files uploaded under one scope
/// are only addressable through the same scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialScope {
    #[default]
    Primary,
    Alternate,
}

impl CredentialScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialScope::Primary => "primary",
            CredentialScope::Alternate => "alternate",
        }
    }
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing state of a remote file. Owned by the remote store; we only observe it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Pending,
    Processing,
    Active,
    Failed,
    /// Catch-all for states this service does not know about.
    #[default]
    #[serde(other)]
    StateUnspecified,
}

/// Handle to a document held by the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Resource name, e.g. `files/abc123`.
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub state: FileState,
    #[serde(default)]
    pub expiration_time: Option<DateTime<Utc>>,
    /// Not part of the wire format; stamped by the backend that produced the handle.
    #[serde(skip)]
    pub scope: CredentialScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Accepts the two role names the remote chat API understands.
    pub fn parse(role: &str) -> Option<Self> {
        match role.trim() {
            "user" => Some(Role::User),
            "model" => Some(Role::Model),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::text(Role::Model, text)
    }

    /// A user turn that attaches `document` ahead of the text.
    pub fn user_with_document(document: &RemoteFile, text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![
                Part::FileData {
                    file_data: FileData {
                        mime_type: document.mime_type.clone(),
                        file_uri: document.uri.clone(),
                    },
                },
                Part::Text { text: text.into() },
            ],
        }
    }

    /// Concatenated text of every text part.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::FileData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}
