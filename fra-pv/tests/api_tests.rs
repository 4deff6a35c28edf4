//! Integration tests for fra-pv API endpoints
//!
//! Tests cover:
//! - Health and build info (no auth required)
//! - Upload-and-verify for each tier, upload validation errors
//! - Re-verification of stored uploads, status and history lookups
//! - API key middleware
//! - Patta extraction, validation and batch extraction

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use fra_common::api::{ApiKey, API_KEY_HEADER};
use fra_pv::extractors::{DocumentExtractor, PlainTextSource};
use fra_pv::services::{SimulatedPortal, UploadStore, VerificationService};
use fra_pv::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const BOUNDARY: &str = "fra-test-boundary";

const GOOD_DOC: &str = "PATTA CERTIFICATE\n\
    Government of Tamil Nadu\n\
    Patta No: 366\n\
    Survey No: 123/4A\n\
    Owner Name: Rajesh Kumar\n\
    Village: Adurakuppam\n\
    Taluk: Kurinjipadi\n\
    District: Cuddalore\n\
    Extent: 2.5 hectares\n\
    Land Type: Dry\n\
    Date: 01/02/2016\n\
    Location: 12.9716 N, 77.5946 E\n";

/// Test app with its temporary upload folder
struct TestApp {
    router: Router,
    uploads: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_state(|s| s).await
    }

    async fn with_state(customise: impl FnOnce(AppState) -> AppState) -> Self {
        let uploads = TempDir::new().unwrap();
        let db = fra_pv::db::init_memory_pool()
            .await
            .expect("Should create in-memory database");

        let verifier = VerificationService::new(
            DocumentExtractor::new(Arc::new(PlainTextSource::new())),
            Arc::new(SimulatedPortal::new()),
        );
        let state = customise(AppState::new(db, verifier, UploadStore::new(uploads.path())));

        Self {
            router: build_router(state),
            uploads,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let body = serde_json::from_slice(&bytes).expect("Should parse JSON");
        (status, body)
    }

    fn stored_files(&self) -> Vec<String> {
        std::fs::read_dir(self.uploads.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }
}

enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        content: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                filename,
                content,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}", name, value)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn upload(filename: &str, content: &str, extra: &[(&str, &str)]) -> Request<Body> {
    let mut parts = vec![Part::File {
        name: "file",
        filename,
        content: content.as_bytes(),
    }];
    for (name, value) in extra {
        parts.push(Part::Text { name, value });
    }
    multipart_request("/api/verification/upload_and_verify", &parts)
}

// =============================================================================
// Public endpoints
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new().await;

    let (status, body) = app.send(get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "fra-pv");
    assert!(body["version"].is_string());
    assert!(body["uptime_seconds"].is_number());
    assert_eq!(body["text_source"], "plain-text");
    assert_eq!(body["portal"], "simulated");
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let app = TestApp::new().await;

    let (status, body) = app.send(get_request("/api/buildinfo")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
}

// =============================================================================
// Upload and verify
// =============================================================================

#[tokio::test]
async fn test_upload_and_verify_full_tier_accepts() {
    let app = TestApp::new().await;

    let (status, body) = app.send(upload("patta.txt", GOOD_DOC, &[])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Verification completed successfully");

    let results = &body["verification_results"];
    assert_eq!(results["success"], true);
    assert_eq!(results["status"], "completed");
    assert_eq!(results["verification_type"], "full");
    assert_eq!(results["state"], "Tamil Nadu");
    assert_eq!(results["final_decision"]["status"], "ACCEPTED");
    assert_eq!(results["final_decision"]["confidence"], 90);
    assert_eq!(results["file_info"]["original_filename"], "patta.txt");
    assert_eq!(
        results["steps_completed"],
        json!([
            "ocr_extraction",
            "portal_verification",
            "gis_verification",
            "authentication",
            "ec_validation",
            "final_decision"
        ])
    );
    assert_eq!(
        results["final_decision"]["recommendations"],
        json!(["Document is verified and accepted"])
    );
    assert_eq!(results["portal_verification"]["matches"]["coordinates"], true);
    assert_eq!(results["gis_verification"]["coordinates_match"], true);
    assert_eq!(results["gis_verification"]["boundary_validation"], true);
    // "Government" reads as watermark wording; a text file this small counts as tampered
    assert_eq!(results["authentication"]["watermark_present"], true);
    assert_eq!(results["authentication"]["tampering_detected"], true);
    assert_eq!(results["ec_validation"]["validation_matches"], true);
    assert_eq!(results["ocr_extraction"]["confidence_scores"]["patta_number"], 76);

    // Successful uploads are kept
    assert_eq!(app.stored_files().len(), 1);
}

#[tokio::test]
async fn test_upload_and_verify_basic_tier_unknown_record_is_flagged() {
    let app = TestApp::new().await;
    let doc = GOOD_DOC.replace("Patta No: 366", "Patta No: INVALID123");

    let (status, body) = app
        .send(upload("patta.txt", &doc, &[("verification_type", "basic"), ("state", "Karnataka")]))
        .await;

    assert_eq!(status, StatusCode::OK);
    let results = &body["verification_results"];
    assert_eq!(results["state"], "Karnataka");
    assert_eq!(results["basic_decision"]["status"], "FLAGGED_FOR_REVIEW");
    assert_eq!(results["basic_decision"]["confidence"], 50);
    assert_eq!(results["portal_verification"]["verified"], false);
    assert!(results.get("final_decision").is_none());
    assert!(results.get("gis_verification").is_none());
}

#[tokio::test]
async fn test_upload_and_verify_quick_tier() {
    let app = TestApp::new().await;

    let (_, body) = app
        .send(upload("patta.txt", GOOD_DOC, &[("verification_type", "quick")]))
        .await;

    let quick = &body["verification_results"]["quick_decision"];
    assert_eq!(quick["status"], "ACCEPTED");
    assert_eq!(quick["required_fields_present"], true);
    assert_eq!(quick["confidence"], quick["ocr_quality"]);
    assert!(body["verification_results"].get("portal_verification").is_none());
}

#[tokio::test]
async fn test_unknown_verification_type_runs_full_tier() {
    let app = TestApp::new().await;

    let (_, body) = app
        .send(upload("patta.txt", GOOD_DOC, &[("verification_type", "thorough")]))
        .await;

    assert_eq!(body["verification_results"]["verification_type"], "full");
    assert!(body["verification_results"]["final_decision"].is_object());
}

#[tokio::test]
async fn test_missing_fields_are_rejected() {
    let app = TestApp::new().await;

    let (_, body) = app
        .send(upload("patta.txt", "Patta No: 12\nSome other text\n", &[("verification_type", "basic")]))
        .await;

    let decision = &body["verification_results"]["basic_decision"];
    assert_eq!(decision["status"], "REJECTED");
    assert_eq!(decision["confidence"], 40);
}

#[tokio::test]
async fn test_failed_extraction_removes_upload() {
    let app = TestApp::new().await;

    let (status, body) = app.send(upload("blank.txt", "   \n  ", &[])).await;

    assert_eq!(status, StatusCode::OK);
    let results = &body["verification_results"];
    assert_eq!(results["success"], false);
    assert_eq!(results["status"], "error");
    assert!(results["error"].is_string());
    assert_eq!(results["final_decision"]["status"], "PENDING");
    assert_eq!(results["final_decision"]["confidence"], 0);
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let app = TestApp::new().await;
    let request = multipart_request(
        "/api/verification/upload_and_verify",
        &[Part::Text {
            name: "state",
            value: "Tamil Nadu",
        }],
    );

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error_code"], "NO_FILE");
}

#[tokio::test]
async fn test_upload_with_empty_filename() {
    let app = TestApp::new().await;

    let (status, body) = app.send(upload("", GOOD_DOC, &[])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "NO_FILE_SELECTED");
}

#[tokio::test]
async fn test_upload_with_disallowed_extension() {
    let app = TestApp::new().await;

    let (status, body) = app.send(upload("patta.exe", GOOD_DOC, &[])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_FILE_TYPE");
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_upload_over_size_limit() {
    let app = TestApp::with_state(|s| s.with_max_upload_bytes(64)).await;

    let (status, body) = app.send(upload("patta.txt", GOOD_DOC, &[])).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error_code"], "FILE_TOO_LARGE");
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_unbounded_upload_limit_builds_router() {
    let app = TestApp::with_state(|s| s.with_max_upload_bytes(usize::MAX)).await;

    let (status, body) = app.send(upload("patta.txt", GOOD_DOC, &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verification_results"]["final_decision"]["status"], "ACCEPTED");

    let request = multipart_request(
        "/api/patta/batch-extract",
        &[Part::File {
            name: "files",
            filename: "one.txt",
            content: GOOD_DOC.as_bytes(),
        }],
    );
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["successful_extractions"], 1);
}

// =============================================================================
// Re-verification, status, history
// =============================================================================

#[tokio::test]
async fn test_verify_existing_upload() {
    let app = TestApp::new().await;
    let (_, uploaded) = app.send(upload("patta.txt", GOOD_DOC, &[])).await;
    let saved = uploaded["verification_results"]["file_info"]["saved_filename"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = app
        .send(json_request(
            "/api/verification/verify_existing",
            json!({"saved_filename": saved, "verification_type": "basic"}),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verification_results"]["basic_decision"]["status"], "ACCEPTED");
    assert_eq!(body["verification_results"]["file_info"]["saved_filename"], saved.as_str());
}

#[tokio::test]
async fn test_verify_existing_missing_file() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(json_request(
            "/api/verification/verify_existing",
            json!({"saved_filename": "20250101_000000_missing.txt"}),
        ))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "FILE_NOT_FOUND");
}

#[tokio::test]
async fn test_verify_existing_rejects_path_traversal() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(json_request(
            "/api/verification/verify_existing",
            json!({"saved_filename": "../../etc/passwd"}),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_verify_existing_requires_json_body() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/verification/verify_existing")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_status_and_history_after_upload() {
    let app = TestApp::new().await;
    let (_, uploaded) = app.send(upload("patta.txt", GOOD_DOC, &[])).await;
    let id = uploaded["verification_results"]["verification_id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = app
        .send(get_request(&format!("/api/verification/get_verification_status/{}", id)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["verification_results"]["verification_id"], id.as_str());
    assert_eq!(body["verification_results"]["final_decision"]["status"], "ACCEPTED");

    let (status, body) = app
        .send(get_request("/api/verification/get_verification_history"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 1);
    let entry = &body["verifications"][0];
    assert_eq!(entry["verification_id"], id.as_str());
    assert_eq!(entry["filename"], "patta.txt");
    assert_eq!(entry["state"], "Tamil Nadu");
    assert_eq!(entry["status"], "completed");
    assert_eq!(entry["final_decision"], "ACCEPTED");
    assert_eq!(entry["confidence"], 90);
}

#[tokio::test]
async fn test_unknown_verification_status() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(get_request("/api/verification/get_verification_status/19990101_000000_000"))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "VERIFICATION_NOT_FOUND");
}

#[tokio::test]
async fn test_empty_history() {
    let app = TestApp::new().await;

    let (_, body) = app
        .send(get_request("/api/verification/get_verification_history"))
        .await;

    assert_eq!(body["success"], true);
    assert_eq!(body["total_count"], 0);
    assert_eq!(body["verifications"], json!([]));
}

#[tokio::test]
async fn test_supported_states() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(get_request("/api/verification/get_supported_states"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["supported_states"],
        json!(["Tamil Nadu", "Andhra Pradesh", "Telangana", "Karnataka"])
    );
    let details = body["state_details"].as_object().unwrap();
    assert_eq!(details.len(), 4);
    assert_eq!(details["Andhra Pradesh"]["api_endpoint"], "/api/land-records");
    assert_eq!(details["Karnataka"]["url"], "https://bhoomi.karnataka.gov.in");
    assert!(body.get("states").is_none());
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_protected_routes_require_api_key() {
    let app = TestApp::with_state(|s| s.with_api_key(ApiKey::new("s3cret"))).await;

    let (status, body) = app
        .send(get_request("/api/verification/get_supported_states"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "UNAUTHORIZED");
    assert_eq!(body["error"], "Missing API key");

    let wrong = Request::builder()
        .uri("/api/verification/get_supported_states")
        .header(API_KEY_HEADER, "guess")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid API key");

    let right = Request::builder()
        .uri("/api/verification/get_supported_states")
        .header(API_KEY_HEADER, "s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(right).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_public_with_api_key() {
    let app = TestApp::with_state(|s| s.with_api_key(ApiKey::new("s3cret"))).await;

    let (status, _) = app.send(get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Patta extraction
// =============================================================================

#[tokio::test]
async fn test_patta_upload_extracts_fields() {
    let app = TestApp::new().await;
    let request = multipart_request(
        "/api/patta/upload",
        &[Part::File {
            name: "file",
            filename: "my patta.txt",
            content: GOOD_DOC.as_bytes(),
        }],
    );

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "my_patta.txt");
    assert_eq!(body["extracted_data"]["name"], "Rajesh Kumar");
    assert_eq!(body["extracted_data"]["patta_no"], "366");
    assert_eq!(body["extracted_data"]["dag_no"], "");
    assert_eq!(body["extracted_data"]["coordinates"], "12.9716 N, 77.5946 E");
    assert_eq!(body["extraction_summary"]["total_fields"], 13);
    // Scratch copy removed
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_patta_upload_extraction_failure() {
    let app = TestApp::new().await;
    let request = multipart_request(
        "/api/patta/upload",
        &[Part::File {
            name: "file",
            filename: "blank.txt",
            content: b"  ",
        }],
    );

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "EXTRACTION_FAILED");
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_patta_validate() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(json_request(
            "/api/patta/validate",
            json!({"extracted_data": {
                "name": "Rajesh Kumar",
                "patta_no": "366",
                "village": "",
                "district": "Cuddalore",
                "area": null
            }}),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["validation_score"], 75.0);
    assert_eq!(body["is_valid"], true);
    assert_eq!(body["validation_results"]["village"]["status"], "missing");
    assert_eq!(body["suggestions"], json!(["Please verify village field"]));
}

#[tokio::test]
async fn test_patta_validate_without_data() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(json_request("/api/patta/validate", json!({})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_batch_extract_reports_per_file_errors() {
    let app = TestApp::new().await;
    let request = multipart_request(
        "/api/patta/batch-extract",
        &[
            Part::File {
                name: "files",
                filename: "one.txt",
                content: GOOD_DOC.as_bytes(),
            },
            Part::File {
                name: "files",
                filename: "two.zip",
                content: b"PK",
            },
        ],
    );

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Processed 2 files");
    assert_eq!(body["summary"]["total_files"], 2);
    assert_eq!(body["summary"]["successful_extractions"], 1);
    assert_eq!(body["summary"]["failed_extractions"], 1);
    assert_eq!(body["results"][0]["filename"], "one.txt");
    assert_eq!(body["errors"][0]["file"], "two.zip");
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_batch_extract_limits_file_count() {
    let app = TestApp::new().await;
    let names: Vec<String> = (0..11).map(|i| format!("doc{}.txt", i)).collect();
    let parts: Vec<Part> = names
        .iter()
        .map(|n| Part::File {
            name: "files",
            filename: n,
            content: GOOD_DOC.as_bytes(),
        })
        .collect();

    let (status, body) = app
        .send(multipart_request("/api/patta/batch-extract", &parts))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "TOO_MANY_FILES");
}

#[tokio::test]
async fn test_batch_extract_without_files() {
    let app = TestApp::new().await;
    let request = multipart_request(
        "/api/patta/batch-extract",
        &[Part::Text {
            name: "note",
            value: "empty",
        }],
    );

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "NO_FILE");
}
