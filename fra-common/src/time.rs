//! Timestamp utilities

use chrono::{DateTime, Local};

/// Build a sortable identifier from a local timestamp
///
/// Format: `YYYYMMDD_HHMMSS_mmm`. Lexicographic order equals chronological
/// order, which the result log relies on for newest-first listings.
pub fn timestamp_id(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S_%3f").to_string()
}

/// Timestamp prefix for stored file names (`YYYYMMDD_HHMMSS`)
pub fn file_prefix(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}
