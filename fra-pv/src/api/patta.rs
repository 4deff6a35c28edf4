//! Patta extraction endpoints
//!
//! Extraction without verification: single upload, batch upload, and
//! validation of reviewer-edited values. Uploaded files are scratch copies,
//! removed once extraction finishes.

use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::api::{check_file, UploadForm, UploadedFile};
use crate::error::{ApiError, ApiResult};
use crate::models::{ExtractionResult, ExtractionSummary, PattaFields};
use crate::services::uploads::secure_filename;
use crate::validators::{validate_extracted_data, ValidationReport};
use crate::{AppState, MAX_BATCH_FILES};

/// Extracted values under the keys reviewers edit; absent fields are empty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub name: String,
    pub father_or_husband: String,
    pub patta_no: String,
    pub survey_no: String,
    pub dag_no: String,
    pub khasra: String,
    pub area: String,
    pub land_type: String,
    pub village: String,
    pub taluk: String,
    pub district: String,
    pub date: String,
    #[serde(default)]
    pub coordinates: String,
}

impl From<&PattaFields> for ExtractedData {
    fn from(fields: &PattaFields) -> Self {
        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            name: value(&fields.owner_name),
            father_or_husband: value(&fields.father_or_husband),
            patta_no: value(&fields.patta_number),
            survey_no: value(&fields.survey_number),
            dag_no: value(&fields.dag_number),
            khasra: value(&fields.khasra_number),
            area: value(&fields.area),
            land_type: value(&fields.land_type),
            village: value(&fields.village),
            taluk: value(&fields.taluk),
            district: value(&fields.district),
            date: value(&fields.date),
            coordinates: value(&fields.coordinates),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub message: String,
    pub filename: String,
    pub file_size: u64,
    pub extracted_data: ExtractedData,
    pub extraction_summary: ExtractionSummary,
}

/// Save a scratch copy, extract, and remove the copy
async fn extract_upload(state: &AppState, file: &UploadedFile) -> ApiResult<ExtractionResult> {
    let stored = state.uploads.save_scratch(&file.filename, &file.bytes).await?;
    let result = state
        .verifier
        .extractor()
        .extract_document(&stored.path)
        .await;
    state.uploads.remove(&stored.path).await;

    result.map_err(|e| ApiError::ExtractionFailed(e.to_string()))
}

/// POST /api/patta/upload
pub async fn upload_and_extract(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ExtractResponse>> {
    let form = UploadForm::read(multipart, "file").await?;
    let file = form.single_file(state.max_upload_bytes)?;

    let extraction = extract_upload(&state, file).await?;
    info!(filename = %file.filename, "Data extraction completed");

    Ok(Json(ExtractResponse {
        success: true,
        message: "Data extracted successfully".to_string(),
        filename: secure_filename(&file.filename),
        file_size: file.bytes.len() as u64,
        extracted_data: ExtractedData::from(&extraction.fields),
        extraction_summary: extraction.summary(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub extracted_data: Option<HashMap<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: ValidationReport,
}

/// POST /api/patta/validate
///
/// Body: `{"extracted_data": {"name": ..., "patta_no": ..., ...}}`.
pub async fn validate_extracted(
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> ApiResult<Json<ValidateResponse>> {
    let Json(request) = payload?;
    let data = request
        .extracted_data
        .ok_or_else(|| ApiError::BadRequest("No extracted data provided".to_string()))?;

    let values: HashMap<String, String> = data
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, text)
        })
        .collect();

    Ok(Json(ValidateResponse {
        success: true,
        report: validate_extracted_data(&values),
    }))
}

#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub filename: String,
    pub extracted_data: ExtractedData,
    pub extraction_summary: ExtractionSummary,
}

#[derive(Debug, Serialize)]
pub struct BatchError {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub successful_extractions: usize,
    pub failed_extractions: usize,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<BatchItem>,
    pub errors: Vec<BatchError>,
    pub summary: BatchSummary,
}

/// POST /api/patta/batch-extract
///
/// Multipart `files` parts, at most [`MAX_BATCH_FILES`]. A bad file is
/// reported in `errors` without failing the batch.
pub async fn batch_extract(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<BatchResponse>> {
    let form = UploadForm::read(multipart, "files").await?;

    if form.files.is_empty() {
        return Err(ApiError::NoFile);
    }
    if form.files.len() > MAX_BATCH_FILES {
        return Err(ApiError::TooManyFiles(MAX_BATCH_FILES));
    }

    let mut results = Vec::new();
    let mut errors = Vec::new();

    for file in &form.files {
        let outcome = match check_file(file, state.max_upload_bytes) {
            Ok(()) => extract_upload(&state, file).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(extraction) => results.push(BatchItem {
                filename: file.filename.clone(),
                extracted_data: ExtractedData::from(&extraction.fields),
                extraction_summary: extraction.summary(),
            }),
            Err(e) => {
                warn!(filename = %file.filename, error = %e, "Batch item failed");
                errors.push(BatchError {
                    file: file.filename.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let total_files = form.files.len();
    info!(
        total_files,
        successful = results.len(),
        failed = errors.len(),
        "Batch extraction completed"
    );

    Ok(Json(BatchResponse {
        success: true,
        message: format!("Processed {} files", total_files),
        summary: BatchSummary {
            total_files,
            successful_extractions: results.len(),
            failed_extractions: errors.len(),
        },
        results,
        errors,
    }))
}
