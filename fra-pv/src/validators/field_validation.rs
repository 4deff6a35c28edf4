//! Standalone validation of client-supplied extracted values
//!
//! Used by `POST /api/patta/validate`, where a reviewer re-submits (possibly
//! edited) extraction output before verification.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Keys that must carry a non-blank value
pub const REQUIRED_KEYS: [&str; 4] = ["name", "patta_no", "village", "district"];

/// Score (percent) at or above which a submission counts as valid
const VALID_SCORE: f64 = 70.0;

static HAS_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static pattern"));
static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}").expect("static pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Present,
    Missing,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCheck {
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub validation_results: BTreeMap<String, FieldCheck>,
    /// Share of checked keys that are present, percent rounded to 2 decimals
    pub validation_score: f64,
    pub suggestions: Vec<String>,
    pub is_valid: bool,
}

/// Check required keys, then the shape of `area` and `date` when given
pub fn validate_extracted_data(data: &HashMap<String, String>) -> ValidationReport {
    let mut results = BTreeMap::new();
    let mut suggestions = Vec::new();

    for key in REQUIRED_KEYS {
        let label = title_case(key);
        let value = data.get(key).map(|v| v.trim()).unwrap_or_default();
        if value.is_empty() {
            results.insert(
                key.to_string(),
                FieldCheck {
                    status: CheckStatus::Missing,
                    message: format!("{} is required", label),
                },
            );
            suggestions.push(format!("Please verify {} field", key.replace('_', " ")));
        } else {
            results.insert(
                key.to_string(),
                FieldCheck {
                    status: CheckStatus::Present,
                    message: format!("{} found", label),
                },
            );
        }
    }

    if let Some(area) = non_blank(data, "area") {
        if !HAS_DIGIT.is_match(area) {
            results.insert(
                "area".to_string(),
                FieldCheck {
                    status: CheckStatus::Warning,
                    message: "Area should contain a number".to_string(),
                },
            );
            suggestions.push("Please verify area measurement".to_string());
        }
    }

    if let Some(date) = non_blank(data, "date") {
        if !DATE_SHAPE.is_match(date) {
            results.insert(
                "date".to_string(),
                FieldCheck {
                    status: CheckStatus::Warning,
                    message: "Date format may be incorrect".to_string(),
                },
            );
            suggestions.push("Please verify date format".to_string());
        }
    }

    let present = results
        .values()
        .filter(|c| c.status == CheckStatus::Present)
        .count();
    let validation_score = if results.is_empty() {
        0.0
    } else {
        (present as f64 / results.len() as f64 * 10_000.0).round() / 100.0
    };

    ValidationReport {
        validation_results: results,
        validation_score,
        suggestions,
        is_valid: validation_score >= VALID_SCORE,
    }
}

fn non_blank<'a>(data: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    data.get(key).map(|v| v.as_str()).filter(|v| !v.trim().is_empty())
}

/// "patta_no" -> "Patta No"
fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_complete_submission_is_valid() {
        let report = validate_extracted_data(&data(&[
            ("name", "Ramesh Kumar"),
            ("patta_no", "366"),
            ("village", "Khargone"),
            ("district", "Cuddalore"),
            ("area", "2.5 hectares"),
            ("date", "01/02/2016"),
        ]));

        assert_eq!(report.validation_score, 100.0);
        assert!(report.is_valid);
        assert!(report.suggestions.is_empty());
        assert_eq!(report.validation_results.len(), 4);
        assert_eq!(report.validation_results["patta_no"].message, "Patta No found");
    }

    #[test]
    fn test_missing_keys_lower_score_and_add_suggestions() {
        let report = validate_extracted_data(&data(&[
            ("name", "Ramesh Kumar"),
            ("patta_no", "  "),
            ("village", "Khargone"),
        ]));

        assert_eq!(report.validation_score, 50.0);
        assert!(!report.is_valid);
        assert_eq!(
            report.suggestions,
            vec!["Please verify patta no field", "Please verify district field"]
        );
        assert_eq!(report.validation_results["district"].status, CheckStatus::Missing);
        assert_eq!(report.validation_results["district"].message, "District is required");
    }

    #[test]
    fn test_area_and_date_warnings_count_against_score() {
        let report = validate_extracted_data(&data(&[
            ("name", "A"),
            ("patta_no", "1"),
            ("village", "V"),
            ("district", "D"),
            ("area", "two hectares"),
            ("date", "March 2016"),
        ]));

        assert_eq!(report.validation_results["area"].status, CheckStatus::Warning);
        assert_eq!(report.validation_results["date"].status, CheckStatus::Warning);
        assert_eq!(report.validation_score, 66.67);
        assert!(!report.is_valid);
        assert_eq!(
            report.suggestions,
            vec!["Please verify area measurement", "Please verify date format"]
        );
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("patta_no"), "Patta No");
        assert_eq!(title_case("district"), "District");
    }
}
