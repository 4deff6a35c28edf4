//! HTTP API handlers for fra-pv

pub mod auth;
pub mod buildinfo;
pub mod health;
pub mod patta;
pub mod verification;

pub use auth::auth_middleware;
pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use patta::{batch_extract, upload_and_extract, validate_extracted};
pub use verification::{
    get_supported_states, get_verification_history, get_verification_status, upload_and_verify,
    verify_existing,
};

use axum::body::Bytes;
use axum::extract::Multipart;
use std::collections::HashMap;

use crate::error::{ApiError, ApiResult};
use crate::services::uploads::allowed_file;

/// One file part of a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// Parsed multipart body: file parts under one field name, text parts by name
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    pub text: HashMap<String, String>,
}

impl UploadForm {
    /// Read every part; parts named `file_field` are collected as files
    pub async fn read(mut multipart: Multipart, file_field: &str) -> ApiResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == file_field {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.files.push(UploadedFile { filename, bytes });
            } else if !name.is_empty() {
                let value = field.text().await?;
                form.text.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Non-blank text field
    pub fn text(&self, name: &str) -> Option<&str> {
        self.text
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// The single uploaded document, checked for presence, name, type and size
    pub fn single_file(&self, max_bytes: usize) -> ApiResult<&UploadedFile> {
        let file = self.files.first().ok_or(ApiError::NoFile)?;
        check_file(file, max_bytes)?;
        Ok(file)
    }
}

/// Reject empty names, disallowed extensions and oversize content
pub fn check_file(file: &UploadedFile, max_bytes: usize) -> ApiResult<()> {
    if file.filename.trim().is_empty() {
        return Err(ApiError::NoFileSelected);
    }
    if !allowed_file(&file.filename) {
        return Err(ApiError::InvalidFileType);
    }
    if file.bytes.len() > max_bytes {
        return Err(ApiError::FileTooLarge(format!(
            "{} bytes exceeds the {} byte limit",
            file.bytes.len(),
            max_bytes
        )));
    }
    Ok(())
}
