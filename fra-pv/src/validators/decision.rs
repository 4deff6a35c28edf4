//! Verification Decision Engine
//!
//! Classifies an extraction (and optional portal lookup) into a tiered
//! [`Decision`].
//!
//! # Scoring
//! - All required fields present: +50
//! - Portal record verified: +40
//!
//! Confidence therefore never exceeds 90.
//!
//! # Status Determination
//! - Accepted: confidence ≥ 80
//! - Flagged for review: confidence ≥ 50
//! - Rejected: confidence < 50
//!
//! The quick tier skips the portal and decides on required fields alone,
//! reporting the OCR quality score as its confidence.
//!
//! The full tier adds reasoning from the portal cross-check and the
//! [`DocumentChecks`]; these never change confidence or status.

use tracing::debug;

use crate::models::{
    AuthenticationCheck, Decision, DecisionStatus, EcValidation, ExtractionResult,
    GisVerification, PortalVerificationResult, QuickDecision,
};

const REQUIRED_FIELDS_WEIGHT: u8 = 50;
const PORTAL_WEIGHT: u8 = 40;

const STRONG_AUTHENTICATION: u8 = 70;
const MODERATE_AUTHENTICATION: u8 = 40;

/// Results of the full tier's document checks
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentChecks<'a> {
    pub gis: Option<&'a GisVerification>,
    pub authentication: Option<&'a AuthenticationCheck>,
    pub ec: Option<&'a EcValidation>,
}

/// Tiered decision engine
///
/// Pure: holds only thresholds, performs no I/O. Identical inputs always
/// produce identical decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionEngine {
    /// Minimum confidence for Accepted
    accept_threshold: u8,
    /// Minimum confidence for FlaggedForReview (below this is Rejected)
    review_threshold: u8,
    /// Minimum OCR score for the quick tier's confidence_threshold_met
    quick_ocr_threshold: u8,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionEngine {
    /// Create engine with default thresholds (80 / 50 / OCR 70)
    pub fn new() -> Self {
        Self {
            accept_threshold: 80,
            review_threshold: 50,
            quick_ocr_threshold: 70,
        }
    }

    /// Create engine with custom thresholds
    pub fn with_thresholds(accept_threshold: u8, review_threshold: u8, quick_ocr_threshold: u8) -> Self {
        Self {
            accept_threshold,
            review_threshold,
            quick_ocr_threshold,
        }
    }

    /// Score required fields and portal result into a decision
    ///
    /// An absent portal result counts as a failed lookup.
    pub fn decide(
        &self,
        extraction: &ExtractionResult,
        portal: Option<&PortalVerificationResult>,
    ) -> Decision {
        let mut confidence: u8 = 0;
        let mut reasoning = Vec::with_capacity(3);

        if extraction.all_required_fields_present() {
            confidence += REQUIRED_FIELDS_WEIGHT;
            reasoning.push("All required fields present".to_string());
        } else {
            reasoning.push(missing_fields_reason(&extraction.validation.missing_fields));
        }

        match portal {
            Some(p) if p.verified => {
                confidence += PORTAL_WEIGHT;
                reasoning.push("Portal verification successful".to_string());
            }
            Some(PortalVerificationResult {
                message: Some(message),
                ..
            }) => reasoning.push(format!("Portal verification failed: {}", message)),
            _ => reasoning.push("Portal verification failed".to_string()),
        }

        let status = self.classify(confidence);

        debug!(
            status = %status,
            confidence,
            required_fields = extraction.all_required_fields_present(),
            portal_verified = portal.map(|p| p.verified).unwrap_or(false),
            "Decision computed"
        );

        Decision {
            status,
            confidence,
            reasoning,
            recommendations: recommendations(status),
        }
    }

    /// Portal-free decision on required fields, with OCR score as confidence
    pub fn decide_quick(&self, extraction: &ExtractionResult) -> QuickDecision {
        let present = extraction.all_required_fields_present();
        let ocr_score = extraction.ocr_quality.score;

        let (status, reason) = if present {
            (DecisionStatus::Accepted, "All required fields present")
        } else {
            (DecisionStatus::Rejected, "Missing required fields")
        };

        debug!(status = %status, ocr_score, "Quick decision computed");

        QuickDecision {
            status,
            reason: reason.to_string(),
            confidence: ocr_score,
            confidence_threshold_met: ocr_score >= self.quick_ocr_threshold,
            required_fields_present: present,
            ocr_quality: ocr_score,
        }
    }

    /// [`decide`](Self::decide) plus reasoning from the portal cross-check
    /// and the document checks
    pub fn decide_full(
        &self,
        extraction: &ExtractionResult,
        portal: Option<&PortalVerificationResult>,
        checks: DocumentChecks<'_>,
    ) -> Decision {
        let mut decision = self.decide(extraction, portal);
        let reasoning = &mut decision.reasoning;

        if let Some(matches) = portal.filter(|p| p.verified).and_then(|p| p.matches.as_ref()) {
            if matches.overall_match {
                reasoning.push("Portal data matches document".to_string());
            } else {
                reasoning.push(format!(
                    "Some portal data mismatches: {}",
                    matches.mismatched().join(", ")
                ));
            }
        }

        if let Some(gis) = checks.gis {
            if gis.coordinates_match {
                reasoning.push("GIS coordinates match".to_string());
            } else if !gis.gis_issues.is_empty() {
                reasoning.push(format!("GIS check incomplete: {}", gis.gis_issues.join(", ")));
            } else {
                reasoning.push("GIS coordinate mismatch".to_string());
            }
        }

        if let Some(auth) = checks.authentication {
            let strength = if auth.authentication_score >= STRONG_AUTHENTICATION {
                "Strong"
            } else if auth.authentication_score >= MODERATE_AUTHENTICATION {
                "Moderate"
            } else {
                "Weak"
            };
            reasoning.push(format!("{} authentication features", strength));
            if auth.tampering_detected {
                reasoning.push("Document tampering detected".to_string());
            }
        }

        if let Some(ec) = checks.ec.filter(|ec| ec.ec_available) {
            if ec.disputes_detected {
                reasoning.push("Legal disputes detected in EC".to_string());
            }
            if ec.loan_liens {
                reasoning.push("Loan liens present".to_string());
            }
            if !ec.validation_matches {
                reasoning.push("EC owner name mismatch".to_string());
            }
        }

        decision
    }

    fn classify(&self, confidence: u8) -> DecisionStatus {
        if confidence >= self.accept_threshold {
            DecisionStatus::Accepted
        } else if confidence >= self.review_threshold {
            DecisionStatus::FlaggedForReview
        } else {
            DecisionStatus::Rejected
        }
    }
}

fn recommendations(status: DecisionStatus) -> Vec<String> {
    let lines: &[&str] = match status {
        DecisionStatus::Accepted => &["Document is verified and accepted"],
        DecisionStatus::FlaggedForReview => &[
            "Document requires manual review",
            "Verify discrepancies with original records",
        ],
        DecisionStatus::Rejected => &[
            "Document verification failed",
            "Do not proceed with transaction",
        ],
        DecisionStatus::Pending => &[],
    };
    lines.iter().map(|l| l.to_string()).collect()
}

fn missing_fields_reason(missing: &[String]) -> String {
    if missing.is_empty() {
        "Missing required fields".to_string()
    } else {
        format!("Missing required fields: {}", missing.join(", "))
    }
}
