//! Document authentication features
//!
//! # Scoring
//! - Valid QR verification payload: +40
//! - Official watermark wording: +30
//! - PDF signature dictionary: +30
//! - Tampering detected: -50
//! - Floored at 0
//!
//! QR payloads are read from the document text, so they are only seen when
//! the text source decodes them.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::models::AuthenticationCheck;

const QR_VALID_WEIGHT: i32 = 40;
const WATERMARK_WEIGHT: i32 = 30;
const SIGNATURE_WEIGHT: i32 = 30;
const TAMPERING_PENALTY: i32 = 50;

/// Genuine scans are rarely this small
const MIN_DOCUMENT_BYTES: u64 = 10_000;
/// A word longer than 3 characters repeated more often than this is suspicious
const MAX_WORD_REPEATS: usize = 10;

const WATERMARK_KEYWORDS: [&str; 4] = ["GOVERNMENT", "OFFICIAL", "VERIFIED", "AUTHENTIC"];

static QR_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*qr(?:[ \t]*code)?[ \t]*[:\-][ \t]*\S+").expect("static pattern")
});

static QR_PAYLOADS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^https://\S*\.gov\.in/verify/",
        r"^PATTA_VERIFY_[A-Z0-9]+$",
        r"^DOC_HASH_[a-f0-9]{64}$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

fn is_verification_payload(token: &str) -> bool {
    QR_PAYLOADS.iter().any(|re| re.is_match(token))
}

/// Inspect a stored document and its extracted text for security features
pub async fn inspect_document(path: &Path, text: &str) -> AuthenticationCheck {
    let mut check = AuthenticationCheck::default();

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read document for authentication");
            check.issues.push(format!("Could not read document: {}", e));
            return check;
        }
    };

    check.qr_code_valid = text.split_whitespace().any(is_verification_payload);
    check.qr_code_present = check.qr_code_valid || QR_LABEL.is_match(text);

    let upper = text.to_uppercase();
    check.watermark_present = WATERMARK_KEYWORDS.iter().any(|k| upper.contains(k));

    check.digital_signature_present = has_pdf_signature(&bytes);

    check.issues = tampering_issues(bytes.len() as u64, text);
    check.tampering_detected = !check.issues.is_empty();

    let mut score = 0;
    if check.qr_code_valid {
        score += QR_VALID_WEIGHT;
    }
    if check.watermark_present {
        score += WATERMARK_WEIGHT;
    }
    if check.digital_signature_present {
        score += SIGNATURE_WEIGHT;
    }
    if check.tampering_detected {
        score -= TAMPERING_PENALTY;
    }
    check.authentication_score = score.clamp(0, 100) as u8;

    debug!(
        path = %path.display(),
        score = check.authentication_score,
        tampering = check.tampering_detected,
        "Authentication check completed"
    );

    check
}

/// PDF with a signature dictionary (`/ByteRange` covers the signed bytes)
fn has_pdf_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
        && contains(bytes, b"/ByteRange")
        && (contains(bytes, b"/Sig") || contains(bytes, b"/Contents"))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn tampering_issues(file_size: u64, text: &str) -> Vec<String> {
    let mut issues = Vec::new();
    if file_size < MIN_DOCUMENT_BYTES {
        issues.push("File size suspiciously small".to_string());
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for word in text.split_whitespace().filter(|w| w.chars().count() > 3) {
        *counts.entry(word.to_lowercase()).or_default() += 1;
    }
    for (word, count) in counts.iter().filter(|(_, c)| **c > MAX_WORD_REPEATS) {
        issues.push(format!("Excessive repetition of '{}' ({} times)", word, count));
    }

    issues
}
