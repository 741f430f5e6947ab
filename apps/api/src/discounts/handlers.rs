//! Axum route handlers for the discount extraction API.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::discounts::aggregate::{extract_all, DiscountTables};
use crate::discounts::band::{resolve_band, ChargeValue};
use crate::discounts::chains::{
    extract_domestic_air_accessorials, extract_domestic_ground, extract_international,
    AirAccessorialsTables, GroundTables, InternationalTables,
};
use crate::documents::ingest::{ingest_document, read_upload};
use crate::documents::readiness::{wait_until_active, wait_until_active_in_any_scope};
use crate::errors::AppError;
use crate::llm_client::RemoteFile;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Body of the single-chain endpoints. `weeklyChargesBand` here is the
/// already-resolved band label.
#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    #[serde(rename = "fileName", default)]
    pub file_name: String,
    #[serde(rename = "weeklyChargesBand", default)]
    pub weekly_charges_band: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_name: String,
    #[serde(rename = "exactWeeklyBandRange")]
    pub exact_weekly_band_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub file_name: String,
    #[serde(rename = "exactWeeklyBandRange")]
    pub exact_weekly_band_range: String,
    pub discounts: DiscountTables,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_file_name: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/analyze
///
/// Full pipeline: ingest → resolve band → wait for ACTIVE → three chains.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let charge = ChargeValue::parse(&upload.weekly_charges_band)?;

    let document = ingest_document(&state.llm, &upload).await?;
    let band = resolve_band(&state.llm, &document.primary, &charge).await?;

    let active = wait_until_active(
        &state.llm,
        document.primary.scope,
        &document.primary.name,
        state.config.poll_policy(),
    )
    .await?;

    let discounts = extract_all(&state.llm, &active, &band, state.config.key_policy()).await?;

    Ok(Json(AnalyzeResponse {
        file_name: document.primary.name,
        exact_weekly_band_range: band,
        discounts,
        alternate_file_name: document.alternate.map(|f| f.name),
    }))
}

/// POST /api/upload-file
///
/// Ingestion and band resolution only.
pub async fn handle_upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let charge = ChargeValue::parse(&upload.weekly_charges_band)?;

    let document = ingest_document(&state.llm, &upload).await?;
    let band = resolve_band(&state.llm, &document.primary, &charge).await?;

    Ok(Json(UploadResponse {
        file_name: document.primary.name,
        exact_weekly_band_range: band,
        alternate_file_name: document.alternate.map(|f| f.name),
    }))
}

/// POST /api/discounts-domestic-air-accesorials
pub async fn handle_domestic_air_accessorials(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<AirAccessorialsTables>, AppError> {
    let document = active_document(&state, &request).await?;
    let tables = extract_domestic_air_accessorials(
        &state.llm,
        &document,
        request.weekly_charges_band.trim(),
        state.config.key_policy(),
    )
    .await?;
    Ok(Json(tables))
}

/// POST /api/discounts-domestic-ground
pub async fn handle_domestic_ground(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<GroundTables>, AppError> {
    let document = active_document(&state, &request).await?;
    let tables = extract_domestic_ground(
        &state.llm,
        &document,
        request.weekly_charges_band.trim(),
        state.config.key_policy(),
    )
    .await?;
    Ok(Json(tables))
}

/// POST /api/discounts_international
pub async fn handle_international(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<InternationalTables>, AppError> {
    let document = active_document(&state, &request).await?;
    let tables = extract_international(
        &state.llm,
        &document,
        request.weekly_charges_band.trim(),
        state.config.key_policy(),
    )
    .await?;
    Ok(Json(tables))
}

/// Validates the body and waits for the referenced file, in whichever scope holds it.
async fn active_document(
    state: &AppState,
    request: &AnalysisRequest,
) -> Result<RemoteFile, AppError> {
    if request.file_name.trim().is_empty() || request.weekly_charges_band.trim().is_empty() {
        return Err(AppError::Validation(
            "fileName and weeklyChargesBand are required".to_string(),
        ));
    }

    wait_until_active_in_any_scope(
        &state.llm,
        request.file_name.trim(),
        state.config.poll_policy(),
    )
    .await
}
