//! Verification pipeline
//!
//! Runs one tier over a stored document:
//! - quick: extraction, quick decision
//! - basic: extraction, portal lookup, decision
//! - full: extraction, portal lookup, GIS, authentication and EC checks,
//!   decision with their reasoning
//!
//! Extraction failure ends the run with `status = error` and a pending
//! decision in the tier's decision slot.

use chrono::{Local, Utc};
use fra_common::time::timestamp_id;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::extractors::DocumentExtractor;
use crate::models::{
    Decision, DecisionStatus, QuickDecision, RunStatus, VerificationReport, VerificationType,
};
use crate::services::authentication::inspect_document;
use crate::services::encumbrance::{cross_validate, EncumbranceRecord};
use crate::services::gis::verify_coordinates;
use crate::services::portal::{verify_with_portal, PortalClient};
use crate::validators::{DecisionEngine, DocumentChecks};

pub const STEP_OCR: &str = "ocr_extraction";
pub const STEP_PORTAL: &str = "portal_verification";
pub const STEP_GIS: &str = "gis_verification";
pub const STEP_AUTHENTICATION: &str = "authentication";
pub const STEP_EC: &str = "ec_validation";
pub const STEP_QUICK_DECISION: &str = "quick_decision";
pub const STEP_BASIC_DECISION: &str = "basic_decision";
pub const STEP_FINAL_DECISION: &str = "final_decision";

#[derive(Clone)]
pub struct VerificationService {
    extractor: DocumentExtractor,
    portal: Arc<dyn PortalClient>,
    engine: DecisionEngine,
}

impl VerificationService {
    pub fn new(extractor: DocumentExtractor, portal: Arc<dyn PortalClient>) -> Self {
        Self {
            extractor,
            portal,
            engine: DecisionEngine::new(),
        }
    }

    pub fn with_engine(mut self, engine: DecisionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn extractor(&self) -> &DocumentExtractor {
        &self.extractor
    }

    pub fn portal_name(&self) -> &'static str {
        self.portal.name()
    }

    /// Run the requested tier; never fails, errors are recorded in the report
    pub async fn verify(
        &self,
        path: &Path,
        state: &str,
        verification_type: VerificationType,
    ) -> VerificationReport {
        let mut report = VerificationReport {
            verification_id: timestamp_id(Local::now()),
            verification_type,
            state: state.to_string(),
            status: RunStatus::Error,
            success: false,
            steps_completed: Vec::new(),
            ocr_extraction: None,
            portal_verification: None,
            gis_verification: None,
            authentication: None,
            ec_validation: None,
            quick_decision: None,
            basic_decision: None,
            final_decision: None,
            error: None,
            file_info: None,
            verified_at: Utc::now(),
        };

        info!(
            verification_id = %report.verification_id,
            tier = verification_type.as_str(),
            state,
            path = %path.display(),
            "Starting verification"
        );

        let document = match self.extractor.read_document(path).await {
            Ok(document) => document,
            Err(e) => {
                warn!(verification_id = %report.verification_id, error = %e, "Extraction failed");
                let reason = format!("Extraction failed: {}", e);
                match verification_type {
                    VerificationType::Quick => report.quick_decision = Some(pending_quick(&reason)),
                    VerificationType::Basic => report.basic_decision = Some(Decision::pending(reason)),
                    VerificationType::Full => report.final_decision = Some(Decision::pending(reason)),
                }
                report.error = Some(e.to_string());
                return report;
            }
        };
        let extraction = document.result;
        report.steps_completed.push(STEP_OCR.to_string());

        match verification_type {
            VerificationType::Quick => {
                report.quick_decision = Some(self.engine.decide_quick(&extraction));
                report.steps_completed.push(STEP_QUICK_DECISION.to_string());
            }
            VerificationType::Basic => {
                let portal = verify_with_portal(self.portal.as_ref(), &extraction, state).await;
                report.steps_completed.push(STEP_PORTAL.to_string());

                report.basic_decision = Some(self.engine.decide(&extraction, Some(&portal)));
                report.steps_completed.push(STEP_BASIC_DECISION.to_string());
                report.portal_verification = Some(portal);
            }
            VerificationType::Full => {
                let portal = verify_with_portal(self.portal.as_ref(), &extraction, state).await;
                report.steps_completed.push(STEP_PORTAL.to_string());

                let gis = verify_coordinates(&extraction.fields, &portal.portal_data);
                report.steps_completed.push(STEP_GIS.to_string());

                let authentication = inspect_document(path, &document.text).await;
                report.steps_completed.push(STEP_AUTHENTICATION.to_string());

                let ec = cross_validate(&extraction.fields, &EncumbranceRecord::simulated());
                report.steps_completed.push(STEP_EC.to_string());

                let checks = DocumentChecks {
                    gis: Some(&gis),
                    authentication: Some(&authentication),
                    ec: Some(&ec),
                };
                report.final_decision = Some(self.engine.decide_full(&extraction, Some(&portal), checks));
                report.steps_completed.push(STEP_FINAL_DECISION.to_string());

                report.portal_verification = Some(portal);
                report.gis_verification = Some(gis);
                report.authentication = Some(authentication);
                report.ec_validation = Some(ec);
            }
        }
        report.ocr_extraction = Some(extraction);

        report.status = RunStatus::Completed;
        report.success = true;
        report.verified_at = Utc::now();

        info!(
            verification_id = %report.verification_id,
            decision = ?report.decision_status(),
            confidence = ?report.decision_confidence(),
            "Verification completed"
        );

        report
    }
}

fn pending_quick(reason: &str) -> QuickDecision {
    QuickDecision {
        status: DecisionStatus::Pending,
        reason: reason.to_string(),
        confidence: 0,
        confidence_threshold_met: false,
        required_fields_present: false,
        ocr_quality: 0,
    }
}
