//! Verification endpoints
//!
//! Upload-and-verify, re-verification of stored uploads, and result log
//! queries.

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::api::UploadForm;
use crate::db::results::{list_history, load_report, save_report, VerificationSummary};
use crate::error::{ApiError, ApiResult};
use crate::models::{VerificationReport, VerificationType};
use crate::services::portal::{StatePortal, SUPPORTED_STATES};
use crate::AppState;

const COMPLETED_MESSAGE: &str = "Verification completed successfully";

#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub success: bool,
    pub verification_results: VerificationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerificationResponse {
    fn completed(report: VerificationReport) -> Self {
        Self {
            success: true,
            verification_results: report,
            message: Some(COMPLETED_MESSAGE.to_string()),
        }
    }
}

/// POST /api/verification/upload_and_verify
///
/// Multipart fields: `file` (required), `state`, `verification_type`.
/// The upload is kept only when verification succeeded.
pub async fn upload_and_verify(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<VerificationResponse>> {
    let form = UploadForm::read(multipart, "file").await?;
    let file = form.single_file(state.max_upload_bytes)?;

    let region = form.text("state").unwrap_or(&state.default_state).to_string();
    let verification_type = VerificationType::parse_or_full(form.text("verification_type"));

    let stored = state.uploads.save(&file.filename, &file.bytes).await?;

    let mut report = state
        .verifier
        .verify(&stored.path, &region, verification_type)
        .await;
    report.file_info = Some(stored.info);

    if !report.success {
        state.uploads.remove(&stored.path).await;
    }

    save_report(&state.db, &mut report).await?;

    Ok(Json(VerificationResponse::completed(report)))
}

#[derive(Debug, Deserialize)]
pub struct VerifyExistingRequest {
    /// Name returned in `file_info.saved_filename` by an earlier upload
    pub saved_filename: String,
    pub state: Option<String>,
    pub verification_type: Option<String>,
}

/// POST /api/verification/verify_existing
pub async fn verify_existing(
    State(state): State<AppState>,
    payload: Result<Json<VerifyExistingRequest>, JsonRejection>,
) -> ApiResult<Json<VerificationResponse>> {
    let Json(request) = payload?;

    let path = state
        .uploads
        .resolve_existing(&request.saved_filename)
        .await
        .map_err(|e| match e {
            fra_common::Error::NotFound(name) => ApiError::FileNotFound(name),
            fra_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Common(other),
        })?;

    let region = request
        .state
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&state.default_state)
        .to_string();
    let verification_type = VerificationType::parse_or_full(request.verification_type.as_deref());

    info!(saved_filename = %request.saved_filename, "Re-verifying stored upload");

    let mut report = state.verifier.verify(&path, &region, verification_type).await;
    report.file_info = Some(state.uploads.describe(&path).await?);

    save_report(&state.db, &mut report).await?;

    Ok(Json(VerificationResponse::completed(report)))
}

/// GET /api/verification/get_verification_status/:verification_id
pub async fn get_verification_status(
    State(state): State<AppState>,
    Path(verification_id): Path<String>,
) -> ApiResult<Json<VerificationResponse>> {
    let report = load_report(&state.db, &verification_id)
        .await?
        .ok_or(ApiError::VerificationNotFound(verification_id))?;

    Ok(Json(VerificationResponse {
        success: true,
        verification_results: report,
        message: None,
    }))
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub verifications: Vec<VerificationSummary>,
    pub total_count: usize,
}

/// GET /api/verification/get_verification_history
///
/// Most recent 50 runs, newest first.
pub async fn get_verification_history(
    State(state): State<AppState>,
) -> ApiResult<Json<HistoryResponse>> {
    let verifications = list_history(&state.db).await?;
    Ok(Json(HistoryResponse {
        success: true,
        total_count: verifications.len(),
        verifications,
    }))
}

#[derive(Debug, Serialize)]
pub struct SupportedStatesResponse {
    pub success: bool,
    /// State names in registry order
    pub supported_states: Vec<&'static str>,
    /// Portal details keyed by state name
    pub state_details: BTreeMap<&'static str, &'static StatePortal>,
}

/// GET /api/verification/get_supported_states
pub async fn get_supported_states() -> Json<SupportedStatesResponse> {
    Json(SupportedStatesResponse {
        success: true,
        supported_states: SUPPORTED_STATES.iter().map(|p| p.name).collect(),
        state_details: SUPPORTED_STATES.iter().map(|p| (p.name, p)).collect(),
    })
}
