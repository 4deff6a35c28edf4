//! Verification result log
//!
//! One row per verification run, keyed by its timestamp-derived id. The full
//! report is kept as JSON; summary columns back the history listing.

use chrono::{DateTime, Utc};
use fra_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use crate::models::{RunStatus, VerificationReport};

/// Entries returned by the history listing
pub const HISTORY_LIMIT: i64 = 50;

/// Attempts at finding a free id when runs collide within one millisecond
const MAX_ID_ATTEMPTS: u32 = 10;

/// History row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub verification_id: String,
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub state: String,
    pub status: String,
    /// Decision status; PENDING when extraction failed
    pub final_decision: String,
    pub confidence: u8,
}

/// Append a report to the log
///
/// If the id is already taken a numeric suffix is added, and the report's
/// `verification_id` is updated to the stored id.
pub async fn save_report(pool: &SqlitePool, report: &mut VerificationReport) -> Result<()> {
    let base_id = report.verification_id.clone();

    for attempt in 0..MAX_ID_ATTEMPTS {
        if attempt > 0 {
            report.verification_id = format!("{}_{}", base_id, attempt);
        }

        let report_json = serde_json::to_string(report)
            .map_err(|e| Error::Internal(format!("Failed to serialize report: {}", e)))?;

        match insert_report(pool, report, &report_json).await {
            Ok(()) => {
                debug!(verification_id = %report.verification_id, "Verification result saved");
                return Ok(());
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                warn!(verification_id = %report.verification_id, "Verification id taken, retrying");
            }
            Err(e) => return Err(Error::Database(e)),
        }
    }

    Err(Error::Internal(format!(
        "No free verification id after {} attempts from {}",
        MAX_ID_ATTEMPTS, base_id
    )))
}

async fn insert_report(
    pool: &SqlitePool,
    report: &VerificationReport,
    report_json: &str,
) -> std::result::Result<(), sqlx::Error> {
    let filename = report
        .file_info
        .as_ref()
        .map(|f| f.original_filename.clone())
        .unwrap_or_default();
    let status = match report.status {
        RunStatus::Completed => "completed",
        RunStatus::Error => "error",
    };
    let final_decision = report
        .decision_status()
        .map(|s| s.as_str())
        .unwrap_or_default();
    let confidence = i64::from(report.decision_confidence().unwrap_or(0));

    sqlx::query(
        r#"
        INSERT INTO verification_results (
            verification_id, created_at, filename, state, status,
            final_decision, confidence, report_json
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&report.verification_id)
    .bind(report.verified_at.to_rfc3339())
    .bind(&filename)
    .bind(&report.state)
    .bind(status)
    .bind(final_decision)
    .bind(confidence)
    .bind(report_json)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a stored report by id
pub async fn load_report(pool: &SqlitePool, verification_id: &str) -> Result<Option<VerificationReport>> {
    let row = sqlx::query("SELECT report_json FROM verification_results WHERE verification_id = ?")
        .bind(verification_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let json: String = row.get("report_json");
            let report = serde_json::from_str(&json)
                .map_err(|e| Error::Internal(format!("Failed to deserialize report: {}", e)))?;
            Ok(Some(report))
        }
        None => Ok(None),
    }
}

/// Most recent summaries, newest first
pub async fn list_history(pool: &SqlitePool) -> Result<Vec<VerificationSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT verification_id, created_at, filename, state, status,
               final_decision, confidence
        FROM verification_results
        ORDER BY verification_id DESC
        LIMIT ?
        "#,
    )
    .bind(HISTORY_LIMIT)
    .fetch_all(pool)
    .await?;

    let mut summaries = Vec::with_capacity(rows.len());
    for row in rows {
        let verification_id: String = row.get("verification_id");
        let created_at: String = row.get("created_at");
        let timestamp = match DateTime::parse_from_rfc3339(&created_at) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                warn!(verification_id = %verification_id, error = %e, "Skipping history row with bad timestamp");
                continue;
            }
        };
        let confidence: i64 = row.get("confidence");

        summaries.push(VerificationSummary {
            verification_id,
            timestamp,
            filename: row.get("filename"),
            state: row.get("state"),
            status: row.get("status"),
            final_decision: row.get("final_decision"),
            confidence: confidence.clamp(0, 100) as u8,
        });
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;
    use crate::models::{Decision, DecisionStatus, FileInfo, VerificationType};

    fn report(id: &str, status: DecisionStatus, confidence: u8) -> VerificationReport {
        VerificationReport {
            verification_id: id.to_string(),
            verification_type: VerificationType::Basic,
            state: "Tamil Nadu".to_string(),
            status: RunStatus::Completed,
            success: true,
            steps_completed: vec!["ocr_extraction".to_string()],
            ocr_extraction: None,
            portal_verification: None,
            gis_verification: None,
            authentication: None,
            ec_validation: None,
            quick_decision: None,
            basic_decision: Some(Decision {
                status,
                confidence,
                reasoning: vec!["All required fields present".to_string()],
                recommendations: vec!["Document requires manual review".to_string()],
            }),
            final_decision: None,
            error: None,
            file_info: Some(FileInfo {
                original_filename: "patta.pdf".to_string(),
                saved_filename: format!("{}_patta.pdf", id),
                file_size: 10,
                sha256: "00".repeat(32),
                upload_timestamp: Utc::now(),
            }),
            verified_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let pool = init_memory_pool().await.unwrap();
        let mut r = report("20250101_100000_000", DecisionStatus::FlaggedForReview, 50);

        save_report(&pool, &mut r).await.unwrap();
        let loaded = load_report(&pool, "20250101_100000_000").await.unwrap().unwrap();

        assert_eq!(loaded, r);
    }

    #[tokio::test]
    async fn test_load_unknown_id_is_none() {
        let pool = init_memory_pool().await.unwrap();
        assert!(load_report(&pool, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_colliding_id_gets_suffix() {
        let pool = init_memory_pool().await.unwrap();
        let mut a = report("20250101_100000_000", DecisionStatus::Accepted, 90);
        let mut b = report("20250101_100000_000", DecisionStatus::Rejected, 0);

        save_report(&pool, &mut a).await.unwrap();
        save_report(&pool, &mut b).await.unwrap();

        assert_eq!(b.verification_id, "20250101_100000_000_1");
        let loaded = load_report(&pool, &b.verification_id).await.unwrap().unwrap();
        assert_eq!(loaded.verification_id, "20250101_100000_000_1");
    }

    #[tokio::test]
    async fn test_history_newest_first_with_summary_fields() {
        let pool = init_memory_pool().await.unwrap();
        for (id, status, confidence) in [
            ("20250101_100000_000", DecisionStatus::Rejected, 0),
            ("20250103_100000_000", DecisionStatus::Accepted, 90),
            ("20250102_100000_000", DecisionStatus::FlaggedForReview, 50),
        ] {
            save_report(&pool, &mut report(id, status, confidence)).await.unwrap();
        }

        let history = list_history(&pool).await.unwrap();
        let ids: Vec<_> = history.iter().map(|h| h.verification_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["20250103_100000_000", "20250102_100000_000", "20250101_100000_000"]
        );
        assert_eq!(history[0].final_decision, "ACCEPTED");
        assert_eq!(history[0].confidence, 90);
        assert_eq!(history[0].filename, "patta.pdf");
        assert_eq!(history[0].status, "completed");
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let pool = init_memory_pool().await.unwrap();
        for i in 0..(HISTORY_LIMIT + 5) {
            let id = format!("20250101_10{:04}_000", i);
            save_report(&pool, &mut report(&id, DecisionStatus::Accepted, 90)).await.unwrap();
        }

        let history = list_history(&pool).await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT as usize);
        assert_eq!(history[0].verification_id, "20250101_100054_000");
    }
}
