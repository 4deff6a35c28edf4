//! GIS coordinate check
//!
//! Compares the coordinates printed on the document with the registry
//! record's `coordinates` object (`{"lat": .., "lon": ..}`) using the
//! haversine distance.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::models::{GisVerification, PattaFields};

const EARTH_RADIUS_KM: f64 = 6371.0;
/// Coordinates closer than this match
pub const MATCH_DISTANCE_KM: f64 = 0.1;

/// India's bounding box
const LAT_RANGE: (f64, f64) = (6.0, 37.0);
const LON_RANGE: (f64, f64) = (68.0, 97.0);

static COORDINATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+\.\d+)[ \t°]*([NS])[, \t]*(\d+\.\d+)[ \t°]*([EW])").expect("static pattern")
});

/// Latitude/longitude pair in signed decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    /// Parse `12.9716 N, 77.5946 E`; south and west are negative
    pub fn parse(text: &str) -> Option<Self> {
        let caps = COORDINATES.captures(text)?;
        let lat: f64 = caps[1].parse().ok()?;
        let lon: f64 = caps[3].parse().ok()?;
        Some(Self {
            lat: if &caps[2] == "S" { -lat } else { lat },
            lon: if &caps[4] == "W" { -lon } else { lon },
        })
    }

    /// Read a registry `{"lat": .., "lon": ..}` object
    pub fn from_record(value: &Value) -> Option<Self> {
        Some(Self {
            lat: value.get("lat")?.as_f64()?,
            lon: value.get("lon")?.as_f64()?,
        })
    }

    /// Great-circle distance in kilometres
    pub fn distance_km(&self, other: &LatLon) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    pub fn within_india(&self) -> bool {
        (LAT_RANGE.0..=LAT_RANGE.1).contains(&self.lat)
            && (LON_RANGE.0..=LON_RANGE.1).contains(&self.lon)
    }
}

/// Check document coordinates against the registry record
pub fn verify_coordinates(fields: &PattaFields, portal_data: &Value) -> GisVerification {
    let mut result = GisVerification::default();

    let Some(text) = fields.coordinates.as_deref() else {
        result.gis_issues.push("No coordinates found in document".to_string());
        return result;
    };
    let Some(document) = LatLon::parse(text) else {
        result.gis_issues.push("Invalid coordinate format".to_string());
        return result;
    };
    result.boundary_validation = document.within_india();

    let Some(registry) = portal_data.get("coordinates").and_then(LatLon::from_record) else {
        result.gis_issues.push("No coordinates in portal data".to_string());
        return result;
    };

    let distance_km = document.distance_km(&registry);
    result.coordinates_match = distance_km < MATCH_DISTANCE_KM;
    result.distance_meters = Some(distance_km * 1000.0);
    result.location_accuracy = (100.0 - distance_km * 1000.0).max(0.0);

    debug!(
        distance_km,
        coordinates_match = result.coordinates_match,
        within_india = result.boundary_validation,
        "GIS check completed"
    );

    result
}
