//! Encumbrance Certificate (EC) cross-check
//!
//! EC records come from the sub-registrar; until that integration exists the
//! pipeline checks against [`EncumbranceRecord::simulated`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::{EcValidation, PattaFields};
use crate::services::portal::fuzzy_match;

/// Registrar's view of a property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncumbranceRecord {
    pub available: bool,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub encumbrances: Vec<Value>,
    #[serde(default)]
    pub disputes: bool,
    #[serde(default)]
    pub loan_liens: bool,
}

impl EncumbranceRecord {
    /// Offline stand-in: a clean record held by Rajesh Kumar
    pub fn simulated() -> Self {
        Self {
            available: true,
            owner_name: Some("Rajesh Kumar".to_string()),
            encumbrances: Vec::new(),
            disputes: false,
            loan_liens: false,
        }
    }
}

/// Compare the document against an EC record
pub fn cross_validate(fields: &PattaFields, record: &EncumbranceRecord) -> EcValidation {
    let mut result = EcValidation {
        ec_available: record.available,
        encumbrances_found: !record.encumbrances.is_empty(),
        disputes_detected: record.disputes,
        loan_liens: record.loan_liens,
        ..Default::default()
    };

    if let (Some(ec_owner), Some(owner)) = (record.owner_name.as_deref(), fields.owner_name.as_deref()) {
        result.validation_matches = fuzzy_match(owner, ec_owner);
    }

    if result.disputes_detected {
        result.ec_issues.push("Legal disputes detected in EC".to_string());
    }
    if result.loan_liens {
        result.ec_issues.push("Loan liens present".to_string());
    }
    if result.encumbrances_found {
        result.ec_issues.push("Encumbrances found on property".to_string());
    }

    debug!(
        available = result.ec_available,
        owner_match = result.validation_matches,
        issues = result.ec_issues.len(),
        "EC cross-check completed"
    );

    result
}
