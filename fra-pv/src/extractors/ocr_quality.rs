//! OCR quality heuristic
//!
//! # Scoring
//! - Text of at least 100 characters: +40, otherwise -30 with issue
//!   "Text too short - possible OCR failure"
//! - Each garbled-text pattern found: -20 with issue "Garbled text detected"
//!   (unexpected symbols, runs of 3+ whitespace characters, 10+ consecutive
//!   lowercase letters)
//! - Each Patta keyword found (patta, survey, village, district): +15
//! - Result clamped to 0-100

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::OcrQuality;

const MIN_TEXT_LENGTH: usize = 100;
const LENGTH_BONUS: i32 = 40;
const SHORT_TEXT_PENALTY: i32 = 30;
const GARBLED_PENALTY: i32 = 20;
const KEYWORD_BONUS: i32 = 15;

const KEYWORDS: [&str; 4] = ["patta", "survey", "village", "district"];

static GARBLED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"[^\w\s.,:;()/\-]", r"\s{3,}", r"[a-z]{10,}"]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Score how trustworthy a block of OCR text looks
pub fn assess_ocr_quality(text: &str) -> OcrQuality {
    let mut score: i32 = 0;
    let mut issues = Vec::new();
    let text_length = text.chars().count();

    if text_length < MIN_TEXT_LENGTH {
        issues.push("Text too short - possible OCR failure".to_string());
        score -= SHORT_TEXT_PENALTY;
    } else {
        score += LENGTH_BONUS;
    }

    for pattern in GARBLED_PATTERNS.iter() {
        if pattern.is_match(text) {
            issues.push("Garbled text detected".to_string());
            score -= GARBLED_PENALTY;
        }
    }

    let lower = text.to_lowercase();
    let found = KEYWORDS.iter().filter(|k| lower.contains(*k)).count() as i32;
    score += found * KEYWORD_BONUS;

    OcrQuality {
        score: score.clamp(0, 100) as u8,
        issues,
        text_length,
    }
}
