//! Text sources: where document text comes from
//!
//! The OCR engine itself is an external collaborator. [`TesseractSource`]
//! shells out to a configured OCR command; [`PlainTextSource`] reads the
//! document's own text layer and is used when no OCR command is configured.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Text extraction failure; aborts verification of the document
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No text could be extracted from the document")]
    NoText,

    #[error("Document has no readable text layer: {0}")]
    Unreadable(String),

    #[error("OCR command failed: {0}")]
    Command(String),
}

/// Produces raw text for a stored document
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Source name for logs and health output
    fn name(&self) -> &'static str;

    async fn read_text(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Reads text directly from the file
///
/// Binary content (scanned images, compressed PDF streams) is rejected rather
/// than passed on as garbage.
#[derive(Debug, Clone, Default)]
pub struct PlainTextSource;

/// Share of non-text characters above which a file is treated as binary
const MAX_BINARY_RATIO: f64 = 0.10;

impl PlainTextSource {
    pub fn new() -> Self {
        Self
    }

    fn binary_ratio(text: &str) -> f64 {
        let total = text.chars().count();
        if total == 0 {
            return 0.0;
        }
        let binary = text
            .chars()
            .filter(|c| *c == '\u{FFFD}' || (c.is_control() && !matches!(c, '\n' | '\r' | '\t')))
            .count();
        binary as f64 / total as f64
    }
}

#[async_trait]
impl TextSource for PlainTextSource {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    async fn read_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }

        let ratio = Self::binary_ratio(&text);
        if ratio > MAX_BINARY_RATIO {
            return Err(ExtractionError::Unreadable(format!(
                "{:.0}% non-text content; configure an OCR command for scanned documents",
                ratio * 100.0
            )));
        }

        Ok(text)
    }
}

/// Runs an external OCR command: `<command> <file> stdout`
#[derive(Debug, Clone)]
pub struct TesseractSource {
    command: String,
}

impl TesseractSource {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl TextSource for TesseractSource {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn read_text(&self, path: &Path) -> Result<String, ExtractionError> {
        debug!(command = %self.command, path = %path.display(), "Running OCR command");

        let output = Command::new(&self.command)
            .arg(path)
            .arg("stdout")
            .output()
            .await
            .map_err(|e| ExtractionError::Command(format!("{}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(command = %self.command, status = %output.status, "OCR command exited with failure");
            return Err(ExtractionError::Command(if stderr.is_empty() {
                format!("{} exited with {}", self.command, output.status)
            } else {
                stderr
            }));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        Ok(text)
    }
}
