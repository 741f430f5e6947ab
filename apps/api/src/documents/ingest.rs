//! Document Ingestion — validates an uploaded contract and writes it through
//! every configured credential scope.
//!
//! The bytes are spilled to a `NamedTempFile` for the upload; the temp file is
//! removed when it drops, so no exit path leaves a local copy behind.

use std::io::Write;

use axum::extract::Multipart;
use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::llm_client::{CredentialScope, LlmClient, RemoteFile};

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const REQUIRED_FIELDS_MESSAGE: &str = "File and weeklyChargesBand are required.";
pub const PDF_ONLY_MESSAGE: &str = "Only PDF files are accepted.";

const FILE_FIELD: &str = "file";
const BAND_FIELD: &str = "weeklyChargesBand";
const FALLBACK_FILE_NAME: &str = "contract.pdf";

/// A contract upload as received from the client, before anything leaves the process.
#[derive(Debug, Clone)]
pub struct ContractUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
    pub weekly_charges_band: String,
}

/// The remote handles produced by one ingestion, one per configured scope.
#[derive(Debug, Clone)]
pub struct IngestedDocument {
    pub primary: RemoteFile,
    pub alternate: Option<RemoteFile>,
}

/// Reads the `file` and `weeklyChargesBand` parts of a multipart form.
/// Unknown parts are ignored.
pub async fn read_upload(mut multipart: Multipart) -> Result<ContractUpload, AppError> {
    let mut file: Option<(Option<String>, Option<String>, Bytes)> = None;
    let mut band: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid file part: {e}")))?;
                file = Some((file_name, content_type, bytes));
            }
            Some(BAND_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid {BAND_FIELD} part: {e}")))?;
                band = Some(text);
            }
            _ => debug!("Ignoring multipart field {:?}", name),
        }
    }

    let band = band
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty());

    match (file, band) {
        (Some((file_name, content_type, bytes)), Some(weekly_charges_band))
            if !bytes.is_empty() =>
        {
            Ok(ContractUpload {
                file_name: file_name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string()),
                content_type,
                bytes,
                weekly_charges_band,
            })
        }
        _ => Err(AppError::Validation(REQUIRED_FIELDS_MESSAGE.to_string())),
    }
}

/// Rejects anything not declared as a PDF. Runs before any remote call.
pub fn ensure_pdf(content_type: Option<&str>) -> Result<(), AppError> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    match essence.as_deref() {
        Some(PDF_MIME_TYPE) => Ok(()),
        _ => Err(AppError::Validation(PDF_ONLY_MESSAGE.to_string())),
    }
}

/// Uploads `upload` under the primary scope and, when configured, the alternate
/// scope. Both uploads run concurrently and both handles are returned.
pub async fn ingest_document(
    llm: &LlmClient,
    upload: &ContractUpload,
) -> Result<IngestedDocument, AppError> {
    ensure_pdf(upload.content_type.as_deref())?;

    let spill = spill_to_tempfile(upload.bytes.clone()).await?;
    let path = spill.path();
    debug!("Spilled {} bytes to {}", upload.bytes.len(), path.display());

    let primary_upload =
        llm.upload_file(CredentialScope::Primary, path, PDF_MIME_TYPE, &upload.file_name);

    let document = if llm.supports_scope(CredentialScope::Alternate) {
        let alternate_upload =
            llm.upload_file(CredentialScope::Alternate, path, PDF_MIME_TYPE, &upload.file_name);
        let (primary, alternate) = tokio::try_join!(primary_upload, alternate_upload)
            .map_err(|e| AppError::from(e).context("Document upload failed"))?;
        IngestedDocument {
            primary,
            alternate: Some(alternate),
        }
    } else {
        warn!("Alternate credential scope not configured; uploading under the primary scope only");
        let primary = primary_upload
            .await
            .map_err(|e| AppError::from(e).context("Document upload failed"))?;
        IngestedDocument {
            primary,
            alternate: None,
        }
    };

    drop(spill);

    info!(
        "Ingested '{}' as {} (alternate: {})",
        upload.file_name,
        document.primary.name,
        document
            .alternate
            .as_ref()
            .map(|f| f.name.as_str())
            .unwrap_or("none")
    );

    Ok(document)
}

async fn spill_to_tempfile(bytes: Bytes) -> Result<NamedTempFile, AppError> {
    tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("contract-")
            .suffix(".pdf")
            .tempfile()?;
        file.write_all(&bytes)?;
        file.flush()?;
        Ok(file)
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
    .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("Failed to spill upload")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_pdf_accepts_pdf() {
        assert!(ensure_pdf(Some("application/pdf")).is_ok());
        assert!(ensure_pdf(Some("Application/PDF; name=contract.pdf")).is_ok());
    }

    #[test]
    fn test_ensure_pdf_rejects_other_types() {
        for ct in [Some("text/plain"), Some("application/octet-stream"), None] {
            let err = ensure_pdf(ct).unwrap_err();
            assert!(matches!(err, AppError::Validation(ref m) if m == PDF_ONLY_MESSAGE));
        }
    }

    #[tokio::test]
    async fn test_spilled_file_is_removed_on_drop() {
        let spill = spill_to_tempfile(Bytes::from_static(b"%PDF-1.4")).await.unwrap();
        let path = spill.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
        drop(spill);
        assert!(!path.exists());
    }
}
