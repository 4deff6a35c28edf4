//! Upload folder management
//!
//! Uploaded documents are stored under `<root>/uploads/patta_verification`
//! as `<YYYYMMDD_HHMMSS>_<sanitised name>`. A numeric suffix is added when
//! two uploads of the same name land in the same second.

use chrono::{Local, Utc};
use fra_common::time::file_prefix;
use fra_common::{Error, Result};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::FileInfo;

/// Document extensions accepted for upload (lowercase)
pub const ALLOWED_EXTENSIONS: [&str; 7] = ["pdf", "png", "jpg", "jpeg", "tiff", "bmp", "txt"];

/// Whether the file name carries an accepted extension
pub fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Reduce a client-supplied name to a safe single path component
///
/// Directory parts are dropped, whitespace becomes `_`, and only ASCII
/// letters, digits, `.`, `_` and `-` are kept. Leading dots and underscores
/// are stripped. A stem that cleans to nothing becomes `document`, keeping
/// the extension. Returns an empty string when nothing usable remains.
pub fn secure_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    if let Some((stem, ext)) = base.rsplit_once('.') {
        let ext = clean_component(ext);
        if clean_component(stem).is_empty() && !ext.is_empty() {
            return format!("{}.{}", FALLBACK_STEM, ext);
        }
    }
    clean_component(base)
}

const FALLBACK_STEM: &str = "document";

fn clean_component(raw: &str) -> String {
    let cleaned: String = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// A document written to the upload folder
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: PathBuf,
    pub info: FileInfo,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an upload under a unique timestamped name
    pub async fn save(&self, original_filename: &str, bytes: &[u8]) -> Result<StoredFile> {
        let prefix = file_prefix(Local::now());
        self.write_new(original_filename, bytes, &prefix).await
    }

    /// Write a short-lived copy for extraction-only requests
    ///
    /// Named `<uuid>_<sanitised name>`; callers remove it when done.
    pub async fn save_scratch(&self, original_filename: &str, bytes: &[u8]) -> Result<StoredFile> {
        let prefix = Uuid::new_v4().to_string();
        self.write_new(original_filename, bytes, &prefix).await
    }

    async fn write_new(&self, original_filename: &str, bytes: &[u8], prefix: &str) -> Result<StoredFile> {
        let safe = secure_filename(original_filename);
        if safe.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Unusable file name: {}",
                original_filename
            )));
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let mut attempt = 0u32;
        let (saved_filename, path, mut file) = loop {
            let name = if attempt == 0 {
                format!("{}_{}", prefix, safe)
            } else {
                format!("{}_{}_{}", prefix, attempt, safe)
            };
            let path = self.dir.join(&name);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (name, path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        };

        file.write_all(bytes).await?;
        file.flush().await?;

        let sha256 = format!("{:x}", Sha256::digest(bytes));
        info!(
            original = %original_filename,
            saved = %saved_filename,
            size = bytes.len(),
            "Upload stored"
        );

        Ok(StoredFile {
            path,
            info: FileInfo {
                original_filename: original_filename.to_string(),
                saved_filename,
                file_size: bytes.len() as u64,
                sha256,
                upload_timestamp: Utc::now(),
            },
        })
    }

    /// Resolve a previously saved file name inside the upload folder
    ///
    /// Rejects anything that is not a plain file name.
    pub async fn resolve_existing(&self, saved_filename: &str) -> Result<PathBuf> {
        let is_plain = !saved_filename.is_empty()
            && saved_filename != "."
            && saved_filename != ".."
            && !saved_filename.contains(['/', '\\'])
            && Path::new(saved_filename).components().count() == 1;
        if !is_plain {
            return Err(Error::InvalidInput(format!(
                "Invalid saved file name: {}",
                saved_filename
            )));
        }

        let path = self.dir.join(saved_filename);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(Error::NotFound(saved_filename.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound(saved_filename.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// File info for an already stored document
    pub async fn describe(&self, path: &Path) -> Result<FileInfo> {
        let bytes = tokio::fs::read(path).await?;
        let saved_filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FileInfo {
            original_filename: saved_filename.clone(),
            saved_filename,
            file_size: bytes.len() as u64,
            sha256: format!("{:x}", Sha256::digest(&bytes)),
            upload_timestamp: Utc::now(),
        })
    }

    /// Delete a stored document; failures are logged, not returned
    pub async fn remove(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Upload removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove upload"),
        }
    }
}
