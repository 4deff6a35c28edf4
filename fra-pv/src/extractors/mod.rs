//! Document field extraction
//!
//! Text comes from a pluggable [`TextSource`] (the OCR collaborator); field
//! patterns and the OCR quality heuristic turn it into an
//! [`ExtractionResult`](crate::models::ExtractionResult).

pub mod ocr_quality;
pub mod patta_fields;
pub mod text_source;

pub use ocr_quality::assess_ocr_quality;
pub use patta_fields::PattaFieldExtractor;
pub use text_source::{ExtractionError, PlainTextSource, TesseractSource, TextSource};

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::ExtractionResult;

/// Document text together with the fields extracted from it
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub result: ExtractionResult,
}

/// Reads a document through a text source and extracts Patta fields
#[derive(Clone)]
pub struct DocumentExtractor {
    source: Arc<dyn TextSource>,
    fields: PattaFieldExtractor,
}

impl DocumentExtractor {
    pub fn new(source: Arc<dyn TextSource>) -> Self {
        Self {
            source,
            fields: PattaFieldExtractor::new(),
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Extract fields from a stored document
    ///
    /// Fails when the text source fails or yields no text; callers surface the
    /// error instead of deciding.
    pub async fn extract_document(&self, path: &Path) -> Result<ExtractionResult, ExtractionError> {
        Ok(self.read_document(path).await?.result)
    }

    /// [`extract_document`](Self::extract_document), keeping the full text
    pub async fn read_document(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
        debug!(source = self.source.name(), path = %path.display(), "Reading document text");
        let text = self.source.read_text(path).await?;
        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }

        let result = self.fields.extract(&text);
        let summary = result.summary();
        info!(
            path = %path.display(),
            extracted = summary.extracted_fields,
            total = summary.total_fields,
            ocr_score = result.ocr_quality.score,
            "Extraction completed"
        );
        Ok(ExtractedDocument { text, result })
    }
}
