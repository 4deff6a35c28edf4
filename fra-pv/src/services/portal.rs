//! State land-registry portal lookup
//!
//! Each supported state has a registry portal with its own endpoint and the
//! lookup fields it expects. A [`PortalClient`] performs the lookup;
//! [`verify_with_portal`] wraps it so that any failure becomes a
//! `verified = false` result rather than an error.

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{ExtractionResult, PattaFields, PortalMatches, PortalVerificationResult};
use crate::services::gis::{LatLon, MATCH_DISTANCE_KM};

const USER_AGENT: &str = concat!("fra-pv/", env!("CARGO_PKG_VERSION"));

/// Minimum normalised similarity for owner names to match
const OWNER_SIMILARITY: f64 = 0.8;
/// Maximum extent difference (same unit) that still matches
const EXTENT_TOLERANCE: f64 = 0.1;
/// Compared fields (of owner, land type, extent, coordinates) that must
/// match for an overall match
const MIN_MATCHING_FIELDS: usize = 3;

/// Patta number the simulated registry never finds
pub const SIMULATED_UNKNOWN_PATTA: &str = "INVALID123";

/// Registry portal of one state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatePortal {
    pub name: &'static str,
    pub url: &'static str,
    pub api_endpoint: &'static str,
    /// Lookup fields the portal expects
    pub fields: &'static [&'static str],
}

pub static SUPPORTED_STATES: [StatePortal; 4] = [
    StatePortal {
        name: "Tamil Nadu",
        url: "https://eservices.tn.gov.in",
        api_endpoint: "/api/patta-verification",
        fields: &["district", "taluk", "village", "survey_number", "patta_number"],
    },
    StatePortal {
        name: "Andhra Pradesh",
        url: "https://meebhoomi.ap.gov.in",
        api_endpoint: "/api/land-records",
        fields: &["district", "mandal", "village", "survey_number", "patta_number"],
    },
    StatePortal {
        name: "Telangana",
        url: "https://dharani.telangana.gov.in",
        api_endpoint: "/api/land-verification",
        fields: &["district", "mandal", "village", "survey_number", "patta_number"],
    },
    StatePortal {
        name: "Karnataka",
        url: "https://bhoomi.karnataka.gov.in",
        api_endpoint: "/api/rtc-verification",
        fields: &["district", "taluk", "village", "survey_number", "patta_number"],
    },
];

/// Look up a state's portal by exact name
pub fn find_portal(state: &str) -> Option<&'static StatePortal> {
    SUPPORTED_STATES.iter().find(|p| p.name == state)
}

impl StatePortal {
    /// Lookup body: the portal's fields from the document, plus a timestamp
    ///
    /// `mandal` is filled from the taluk field; missing values are sent empty.
    pub fn lookup_request(&self, fields: &PattaFields) -> Map<String, Value> {
        let mut body = Map::new();
        for name in self.fields {
            let value = match *name {
                "district" => fields.district.as_deref(),
                "taluk" | "mandal" => fields.taluk.as_deref(),
                "village" => fields.village.as_deref(),
                "survey_number" => fields.survey_number.as_deref(),
                "patta_number" => fields.patta_number.as_deref(),
                _ => None,
            };
            body.insert((*name).to_string(), Value::from(value.unwrap_or_default()));
        }
        body.insert("timestamp".to_string(), Value::from(Utc::now().to_rfc3339()));
        body
    }
}

/// Portal lookup errors
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Portal returned {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Performs one registry lookup
///
/// Returns the registry record; a boolean `found` key says whether a
/// matching record exists.
#[async_trait]
pub trait PortalClient: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(
        &self,
        portal: &StatePortal,
        request: &Map<String, Value>,
    ) -> Result<Value, PortalError>;
}

/// Offline registry stand-in
///
/// Finds every record except patta number [`SIMULATED_UNKNOWN_PATTA`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedPortal;

impl SimulatedPortal {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PortalClient for SimulatedPortal {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn lookup(
        &self,
        portal: &StatePortal,
        request: &Map<String, Value>,
    ) -> Result<Value, PortalError> {
        let found = request.get("patta_number").and_then(Value::as_str) != Some(SIMULATED_UNKNOWN_PATTA);
        debug!(state = portal.name, found, "Simulated portal lookup");

        Ok(json!({
            "found": found,
            "owner_name": "Rajesh Kumar",
            "land_type": "Dry",
            "extent": "2.5 hectares",
            "coordinates": {"lat": 12.9716, "lon": 77.5946},
            "tax_details": {"current_year": 2024, "amount": 1500, "status": "Paid"},
            "encumbrances": [],
            "portal_watermark": true,
            "qr_code_present": true,
        }))
    }
}

/// JSON-over-HTTP registry client
pub struct HttpPortal {
    http_client: reqwest::Client,
    /// Replaces every portal's own URL when set
    base_url: Option<String>,
}

impl HttpPortal {
    pub fn new(timeout: Duration, base_url: Option<String>) -> Result<Self, PortalError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| PortalError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn endpoint_url(&self, portal: &StatePortal) -> String {
        let base = self.base_url.as_deref().unwrap_or(portal.url);
        format!("{}{}", base.trim_end_matches('/'), portal.api_endpoint)
    }
}

#[async_trait]
impl PortalClient for HttpPortal {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn lookup(
        &self,
        portal: &StatePortal,
        request: &Map<String, Value>,
    ) -> Result<Value, PortalError> {
        let url = self.endpoint_url(portal);
        debug!(state = portal.name, url = %url, "Querying registry portal");

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| PortalError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PortalError::Api(status.as_u16(), error_text));
        }

        let record: Value = response
            .json()
            .await
            .map_err(|e| PortalError::Parse(e.to_string()))?;

        if !record.is_object() {
            return Err(PortalError::Parse("expected a JSON object".to_string()));
        }
        Ok(record)
    }
}

/// Look the document up in the state's registry
///
/// Unknown states, transport failures and unreadable responses all yield
/// `verified = false` with a message.
pub async fn verify_with_portal(
    client: &dyn PortalClient,
    extraction: &ExtractionResult,
    state: &str,
) -> PortalVerificationResult {
    let Some(portal) = find_portal(state) else {
        warn!(state, "No registry portal configured");
        return PortalVerificationResult::failed(state, format!("Portal not configured for {}", state));
    };

    info!(state, client = client.name(), "Verifying with state portal");
    let request = portal.lookup_request(&extraction.fields);

    match client.lookup(portal, &request).await {
        Ok(record) => {
            let verified = record.get("found").and_then(Value::as_bool).unwrap_or(false);
            let matches = compare_portal_data(&extraction.fields, &record);
            info!(state, verified, overall_match = matches.overall_match, "Portal lookup completed");

            PortalVerificationResult {
                verified,
                state: state.to_string(),
                message: (!verified).then(|| "No matching record found in portal".to_string()),
                portal_data: record,
                matches: Some(matches),
                verified_at: Utc::now(),
            }
        }
        Err(e) => {
            warn!(state, error = %e, "Portal lookup failed");
            PortalVerificationResult::failed(state, e.to_string())
        }
    }
}

static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.?\d*)").expect("static pattern"));

/// Compare document fields against a registry record
///
/// Nothing matches when the record was not found.
pub fn compare_portal_data(fields: &PattaFields, record: &Value) -> PortalMatches {
    if !record.get("found").and_then(Value::as_bool).unwrap_or(false) {
        return PortalMatches::default();
    }

    let record_str = |key: &str| record.get(key).and_then(Value::as_str).unwrap_or_default();

    let owner_name = match fields.owner_name.as_deref() {
        Some(name) => fuzzy_match(name, record_str("owner_name")),
        None => false,
    };

    let land_type = match fields.land_type.as_deref() {
        Some(doc_type) => {
            let doc_type = doc_type.trim().to_lowercase();
            let portal_type = record_str("land_type").trim().to_lowercase();
            !doc_type.is_empty()
                && !portal_type.is_empty()
                && (portal_type.contains(&doc_type) || doc_type.contains(&portal_type))
        }
        None => false,
    };

    let extent = match (
        fields.area.as_deref().and_then(numeric_value),
        numeric_value(record_str("extent")),
    ) {
        (Some(doc), Some(portal)) => (doc - portal).abs() < EXTENT_TOLERANCE,
        _ => false,
    };

    let coordinates = match (
        fields.coordinates.as_deref().and_then(LatLon::parse),
        record.get("coordinates").and_then(LatLon::from_record),
    ) {
        (Some(doc), Some(portal)) => doc.distance_km(&portal) < MATCH_DISTANCE_KM,
        _ => false,
    };

    let matching = [owner_name, land_type, extent, coordinates]
        .iter()
        .filter(|m| **m)
        .count();

    PortalMatches {
        owner_name,
        land_type,
        extent,
        coordinates,
        overall_match: matching >= MIN_MATCHING_FIELDS,
    }
}

/// Case-insensitive name similarity of at least 0.8
pub(crate) fn fuzzy_match(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    strsim::normalized_levenshtein(&a, &b) >= OWNER_SIMILARITY
}

fn numeric_value(text: &str) -> Option<f64> {
    NUMERIC
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
