//! Patta field extraction from document text
//!
//! Each field has an ordered list of label patterns; the first pattern that
//! yields a non-empty capture wins. Values are whitespace-normalised and cut
//! at the first run of two or more spaces, where OCR output usually places
//! the next column.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::warn;

use crate::extractors::ocr_quality::assess_ocr_quality;
use crate::models::{ExtractionResult, FieldValidation, PattaField, PattaFields};

/// Length of raw text kept in the result for diagnostics
const SNIPPET_CHARS: usize = 1000;

/// Field confidence: base for any match, plus per character, capped
const FIELD_CONFIDENCE_BASE: usize = 70;
const FIELD_CONFIDENCE_PER_CHAR: usize = 2;
const FIELD_CONFIDENCE_MAX: usize = 95;

const SEP: &str = r"[ \t]*[:\-–][ \t]*";
const OPT_SEP: &str = r"[ \t]*[:\-–]?[ \t]*";
const IDENT: &str = r"([A-Za-z0-9][A-Za-z0-9/\-]*)";
const NAME: &str = r"([A-Za-z][A-Za-z .]*)";
const PLACE: &str = r"([A-Za-z][A-Za-z ]*)";

fn field_patterns(field: PattaField) -> Vec<String> {
    match field {
        PattaField::OwnerName => vec![
            format!(r"(?im)\b(?:owner[ \t]*name|name[ \t]*of[ \t]*(?:the[ \t]*)?owner|patta[ \t]*holder|applicant(?:[ \t]*name)?){SEP}{NAME}"),
            format!(r"(?im)^[ \t]*(?:name|holder){SEP}{NAME}"),
        ],
        PattaField::FatherOrHusband => vec![
            format!(r"(?im)\b(?:father[ \t]*/[ \t]*husband|father|husband)(?:[ \t]*name)?{SEP}{NAME}"),
        ],
        PattaField::PattaNumber => vec![
            format!(r"(?i)\bpatta[ \t]*(?:number|no\.?|#){OPT_SEP}{IDENT}"),
            format!(r"(?i)\bRTR{SEP}{IDENT}"),
        ],
        PattaField::SurveyNumber => vec![
            format!(r"(?i)\bsurvey[ \t]*(?:number|no\.?){OPT_SEP}{IDENT}"),
        ],
        PattaField::DagNumber => vec![
            format!(r"(?i)\bdag[ \t]*(?:number|no\.?){OPT_SEP}{IDENT}"),
        ],
        PattaField::KhasraNumber => vec![
            format!(r"(?i)\bkhasra(?:[ \t]*(?:number|no\.?))?{OPT_SEP}{IDENT}"),
        ],
        PattaField::Area => vec![
            format!(r"(?i)\b(?:land[ \t]*)?(?:area|extent){OPT_SEP}([0-9][0-9.,]*(?:[ \t]*[A-Za-z]+\.?)?)"),
        ],
        PattaField::LandType => vec![
            format!(r"(?i)\b(?:land[ \t]*)?type{OPT_SEP}(wet|dry|irrigated|non-irrigated)\b"),
        ],
        PattaField::Village => vec![
            format!(r"(?im)\b(?:revenue[ \t]*)?village{SEP}{PLACE}"),
        ],
        PattaField::Taluk => vec![
            format!(r"(?im)\b(?:taluk|tehsil|mandal){SEP}{PLACE}"),
        ],
        PattaField::District => vec![
            format!(r"(?im)\b(?:district|dist\.){SEP}{PLACE}"),
        ],
        PattaField::Date => vec![
            format!(r"(?i)\b(?:issued[ \t]*date|date[ \t]*of[ \t]*issue|date){OPT_SEP}(\d{{1,2}}[/\-.]\d{{1,2}}[/\-.]\d{{2,4}})"),
            r"\b(\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4})\b".to_string(),
        ],
        PattaField::Coordinates => vec![
            r"(\d+\.\d+[ \t]?°?[ \t]?[NS][ \t]?,?[ \t]?\d+\.\d+[ \t]?°?[ \t]?[EW])\b".to_string(),
        ],
    }
}

static COMPILED_PATTERNS: Lazy<Vec<(PattaField, Vec<Regex>)>> = Lazy::new(|| {
    PattaField::ALL
        .iter()
        .map(|field| {
            let regexes = field_patterns(*field)
                .iter()
                .filter_map(|p| match Regex::new(p) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(field = %field, error = %e, "Skipping invalid field pattern");
                        None
                    }
                })
                .collect();
            (*field, regexes)
        })
        .collect()
});

static IDENT_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9/\-]+$").expect("static pattern"));

static COLUMN_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").expect("static pattern"));

/// Extracts [`PattaFields`] from text and validates them
#[derive(Debug, Clone, Default)]
pub struct PattaFieldExtractor;

impl PattaFieldExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Run every field pattern, validate, and assess OCR quality
    pub fn extract(&self, text: &str) -> ExtractionResult {
        let mut fields = PattaFields::default();
        for (field, patterns) in COMPILED_PATTERNS.iter() {
            fields.set(*field, Self::extract_field(text, patterns));
        }

        let validation = validate_required_fields(&fields);
        let confidence_scores = PattaField::ALL
            .iter()
            .map(|field| (*field, field_confidence(fields.get(*field))))
            .collect();

        ExtractionResult {
            fields,
            confidence_scores,
            validation,
            ocr_quality: assess_ocr_quality(text),
            raw_text_snippet: text.chars().take(SNIPPET_CHARS).collect(),
            extracted_at: Utc::now(),
        }
    }

    fn extract_field(text: &str, patterns: &[Regex]) -> Option<String> {
        patterns
            .iter()
            .filter_map(|re| re.captures(text))
            .filter_map(|caps| caps.get(1).map(|m| clean_value(m.as_str())))
            .find(|value| !value.is_empty())
    }
}

/// Longer captures are less likely to be stray matches
fn field_confidence(value: Option<&str>) -> u8 {
    match value {
        Some(v) => {
            let score = FIELD_CONFIDENCE_BASE + v.chars().count() * FIELD_CONFIDENCE_PER_CHAR;
            score.min(FIELD_CONFIDENCE_MAX) as u8
        }
        None => 0,
    }
}

/// Cut at the first column gap, collapse whitespace, trim stray punctuation
fn clean_value(raw: &str) -> String {
    let first_column = COLUMN_GAP.split(raw.trim()).next().unwrap_or_default();
    first_column
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(&['.', ',', '-'][..])
        .to_string()
}

/// Check required fields and identifier formats
pub fn validate_required_fields(fields: &PattaFields) -> FieldValidation {
    let missing_fields: Vec<String> = PattaField::REQUIRED
        .iter()
        .filter(|f| fields.get(**f).is_none())
        .map(|f| f.as_str().to_string())
        .collect();

    let mut format_issues = Vec::new();
    if let Some(patta) = fields.get(PattaField::PattaNumber) {
        if !IDENT_FORMAT.is_match(&patta.to_uppercase()) {
            format_issues.push("Invalid Patta Number format".to_string());
        }
    }
    if let Some(survey) = fields.get(PattaField::SurveyNumber) {
        if !IDENT_FORMAT.is_match(&survey.to_uppercase()) {
            format_issues.push("Invalid Survey Number format".to_string());
        }
    }

    let all_present = missing_fields.is_empty();
    FieldValidation {
        all_required_fields_present: all_present,
        overall_valid: all_present && format_issues.is_empty(),
        missing_fields,
        format_issues,
    }
}
