//! Data models for Patta verification
//!
//! Extraction results, portal lookups, decisions and the verification report
//! written to the result log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Extraction
// ============================================================================

/// Named fields a Patta document can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PattaField {
    OwnerName,
    FatherOrHusband,
    PattaNumber,
    SurveyNumber,
    DagNumber,
    KhasraNumber,
    Area,
    LandType,
    Village,
    Taluk,
    District,
    Date,
    /// Latitude/longitude pair, e.g. `12.9716 N, 77.5946 E`
    Coordinates,
}

impl PattaField {
    pub const ALL: [PattaField; 13] = [
        PattaField::OwnerName,
        PattaField::FatherOrHusband,
        PattaField::PattaNumber,
        PattaField::SurveyNumber,
        PattaField::DagNumber,
        PattaField::KhasraNumber,
        PattaField::Area,
        PattaField::LandType,
        PattaField::Village,
        PattaField::Taluk,
        PattaField::District,
        PattaField::Date,
        PattaField::Coordinates,
    ];

    /// Fields that must be present for a document to count as complete
    pub const REQUIRED: [PattaField; 5] = [
        PattaField::PattaNumber,
        PattaField::SurveyNumber,
        PattaField::District,
        PattaField::Village,
        PattaField::OwnerName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PattaField::OwnerName => "owner_name",
            PattaField::FatherOrHusband => "father_or_husband",
            PattaField::PattaNumber => "patta_number",
            PattaField::SurveyNumber => "survey_number",
            PattaField::DagNumber => "dag_number",
            PattaField::KhasraNumber => "khasra_number",
            PattaField::Area => "area",
            PattaField::LandType => "land_type",
            PattaField::Village => "village",
            PattaField::Taluk => "taluk",
            PattaField::District => "district",
            PattaField::Date => "date",
            PattaField::Coordinates => "coordinates",
        }
    }
}

impl fmt::Display for PattaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field values pulled from a document; `None` means not found
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PattaFields {
    pub owner_name: Option<String>,
    pub father_or_husband: Option<String>,
    pub patta_number: Option<String>,
    pub survey_number: Option<String>,
    pub dag_number: Option<String>,
    pub khasra_number: Option<String>,
    pub area: Option<String>,
    pub land_type: Option<String>,
    pub village: Option<String>,
    pub taluk: Option<String>,
    pub district: Option<String>,
    pub date: Option<String>,
    pub coordinates: Option<String>,
}

impl PattaFields {
    pub fn get(&self, field: PattaField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: PattaField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    /// Number of fields with a value
    pub fn extracted_count(&self) -> usize {
        PattaField::ALL
            .iter()
            .filter(|f| self.get(**f).is_some())
            .count()
    }

    fn slot(&self, field: PattaField) -> &Option<String> {
        match field {
            PattaField::OwnerName => &self.owner_name,
            PattaField::FatherOrHusband => &self.father_or_husband,
            PattaField::PattaNumber => &self.patta_number,
            PattaField::SurveyNumber => &self.survey_number,
            PattaField::DagNumber => &self.dag_number,
            PattaField::KhasraNumber => &self.khasra_number,
            PattaField::Area => &self.area,
            PattaField::LandType => &self.land_type,
            PattaField::Village => &self.village,
            PattaField::Taluk => &self.taluk,
            PattaField::District => &self.district,
            PattaField::Date => &self.date,
            PattaField::Coordinates => &self.coordinates,
        }
    }

    fn slot_mut(&mut self, field: PattaField) -> &mut Option<String> {
        match field {
            PattaField::OwnerName => &mut self.owner_name,
            PattaField::FatherOrHusband => &mut self.father_or_husband,
            PattaField::PattaNumber => &mut self.patta_number,
            PattaField::SurveyNumber => &mut self.survey_number,
            PattaField::DagNumber => &mut self.dag_number,
            PattaField::KhasraNumber => &mut self.khasra_number,
            PattaField::Area => &mut self.area,
            PattaField::LandType => &mut self.land_type,
            PattaField::Village => &mut self.village,
            PattaField::Taluk => &mut self.taluk,
            PattaField::District => &mut self.district,
            PattaField::Date => &mut self.date,
            PattaField::Coordinates => &mut self.coordinates,
        }
    }
}

/// Required-field and format check over extracted fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    pub all_required_fields_present: bool,
    pub missing_fields: Vec<String>,
    pub format_issues: Vec<String>,
    /// All required fields present AND no format issues
    pub overall_valid: bool,
}

/// OCR quality assessment (score 0-100)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrQuality {
    pub score: u8,
    pub issues: Vec<String>,
    pub text_length: usize,
}

/// Structured result of running field extraction over one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub fields: PattaFields,
    /// Per-field confidence (0-100); 0 for fields not found
    #[serde(default)]
    pub confidence_scores: BTreeMap<PattaField, u8>,
    pub validation: FieldValidation,
    pub ocr_quality: OcrQuality,
    pub raw_text_snippet: String,
    pub extracted_at: DateTime<Utc>,
}

impl ExtractionResult {
    pub fn all_required_fields_present(&self) -> bool {
        self.validation.all_required_fields_present
    }

    pub fn summary(&self) -> ExtractionSummary {
        let extracted = self.fields.extracted_count();
        let total = PattaField::ALL.len();
        let success_rate = (extracted as f64 / total as f64 * 10_000.0).round() / 100.0;
        ExtractionSummary {
            extracted_fields: extracted,
            total_fields: total,
            success_rate,
            text_length: self.ocr_quality.text_length,
        }
    }
}

/// Extraction statistics reported by the patta endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub extracted_fields: usize,
    pub total_fields: usize,
    /// Percentage, rounded to 2 decimals
    pub success_rate: f64,
    pub text_length: usize,
}

// ============================================================================
// Portal verification
// ============================================================================

/// Field-by-field comparison of a registry record against the document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalMatches {
    pub owner_name: bool,
    pub land_type: bool,
    pub extent: bool,
    /// Document coordinates within 100 m of the registry's
    #[serde(default)]
    pub coordinates: bool,
    pub overall_match: bool,
}

impl PortalMatches {
    /// Names of compared fields that did not match
    pub fn mismatched(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if !self.owner_name {
            fields.push("owner_name");
        }
        if !self.land_type {
            fields.push("land_type");
        }
        if !self.extent {
            fields.push("extent");
        }
        if !self.coordinates {
            fields.push("coordinates");
        }
        fields
    }
}

/// Outcome of one registry lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalVerificationResult {
    pub verified: bool,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Registry metadata, shape defined by the portal
    #[serde(default)]
    pub portal_data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<PortalMatches>,
    pub verified_at: DateTime<Utc>,
}

impl PortalVerificationResult {
    /// Lookup that could not be completed; counts as not verified
    pub fn failed(state: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            verified: false,
            state: state.into(),
            message: Some(message.into()),
            portal_data: serde_json::Value::Null,
            matches: None,
            verified_at: Utc::now(),
        }
    }
}

// ============================================================================
// Decisions
// ============================================================================

/// Tiered verification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Accepted,
    FlaggedForReview,
    Rejected,
    Pending,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Accepted => "ACCEPTED",
            DecisionStatus::FlaggedForReview => "FLAGGED_FOR_REVIEW",
            DecisionStatus::Rejected => "REJECTED",
            DecisionStatus::Pending => "PENDING",
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision with confidence (0-100), ordered reasoning and follow-up actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub status: DecisionStatus,
    pub confidence: u8,
    pub reasoning: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl Decision {
    /// Placeholder for a run that ended before a decision could be made
    pub fn pending(reason: impl Into<String>) -> Self {
        Self {
            status: DecisionStatus::Pending,
            confidence: 0,
            reasoning: vec![reason.into()],
            recommendations: vec!["Resubmit a readable document".to_string()],
        }
    }
}

/// Portal-free decision from required fields and OCR quality
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickDecision {
    pub status: DecisionStatus,
    pub reason: String,
    /// OCR quality score
    pub confidence: u8,
    pub confidence_threshold_met: bool,
    pub required_fields_present: bool,
    pub ocr_quality: u8,
}

// ============================================================================
// Full-tier document checks
// ============================================================================

/// Document coordinates checked against the registry's
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GisVerification {
    pub coordinates_match: bool,
    /// Document coordinates fall inside India's bounding box
    pub boundary_validation: bool,
    /// 100 minus the distance in metres, floored at 0
    pub location_accuracy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    pub gis_issues: Vec<String>,
}

/// Security features found on the document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationCheck {
    pub qr_code_present: bool,
    pub qr_code_valid: bool,
    pub watermark_present: bool,
    pub digital_signature_present: bool,
    pub tampering_detected: bool,
    /// 0-100
    pub authentication_score: u8,
    pub issues: Vec<String>,
}

/// Encumbrance Certificate cross-check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcValidation {
    pub ec_available: bool,
    pub encumbrances_found: bool,
    pub disputes_detected: bool,
    pub loan_liens: bool,
    /// EC owner matches the document owner
    pub validation_matches: bool,
    pub ec_issues: Vec<String>,
}

// ============================================================================
// Verification report
// ============================================================================

/// Which signals a verification run combines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationType {
    /// Extraction only
    Quick,
    /// Extraction + portal lookup
    Basic,
    /// Extraction + portal lookup + GIS, authentication and EC checks
    #[default]
    Full,
}

impl VerificationType {
    /// Parse a client-supplied tier; anything unrecognised runs the full tier
    pub fn parse_or_full(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("quick") => VerificationType::Quick,
            Some("basic") => VerificationType::Basic,
            _ => VerificationType::Full,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationType::Quick => "quick",
            VerificationType::Basic => "basic",
            VerificationType::Full => "full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Error,
}

/// Metadata about the stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub original_filename: String,
    pub saved_filename: String,
    pub file_size: u64,
    pub sha256: String,
    pub upload_timestamp: DateTime<Utc>,
}

/// Everything one verification run produced; serialized into the result log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub verification_id: String,
    pub verification_type: VerificationType,
    pub state: String,
    pub status: RunStatus,
    pub success: bool,
    pub steps_completed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_extraction: Option<ExtractionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portal_verification: Option<PortalVerificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gis_verification: Option<GisVerification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthenticationCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ec_validation: Option<EcValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_decision: Option<QuickDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_decision: Option<Decision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_decision: Option<Decision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
    pub verified_at: DateTime<Utc>,
}

impl VerificationReport {
    /// Status of whichever decision this tier produced
    pub fn decision_status(&self) -> Option<DecisionStatus> {
        self.final_decision
            .as_ref()
            .or(self.basic_decision.as_ref())
            .map(|d| d.status)
            .or_else(|| self.quick_decision.as_ref().map(|q| q.status))
    }

    /// Confidence of whichever decision this tier produced
    pub fn decision_confidence(&self) -> Option<u8> {
        self.final_decision
            .as_ref()
            .or(self.basic_decision.as_ref())
            .map(|d| d.confidence)
            .or_else(|| self.quick_decision.as_ref().map(|q| q.confidence))
    }
}
