//! fra-pv library - Patta Verification module
//!
//! Verifies forest-rights land-claim (Patta) documents: field extraction,
//! state registry lookup, tiered decision, and a persistent result log.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use fra_common::api::ApiKey;
use sqlx::SqlitePool;
use std::time::Instant;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod extractors;
pub mod models;
pub mod services;
pub mod validators;

use services::{UploadStore, VerificationService};

/// Room for multipart boundaries and text fields on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Files accepted by one batch extraction request
pub const MAX_BATCH_FILES: usize = 10;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Result log connection pool
    pub db: SqlitePool,
    /// Extraction, portal lookup and decision pipeline
    pub verifier: VerificationService,
    /// Upload folder
    pub uploads: UploadStore,
    /// `None` disables authentication
    pub api_key: Option<ApiKey>,
    /// State used when a request names none
    pub default_state: String,
    /// Per-file upload limit
    pub max_upload_bytes: usize,
    /// Server start, for uptime reporting
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(db: SqlitePool, verifier: VerificationService, uploads: UploadStore) -> Self {
        Self {
            db,
            verifier,
            uploads,
            api_key: None,
            default_state: "Tamil Nadu".to_string(),
            max_upload_bytes: fra_common::config::DEFAULT_MAX_UPLOAD_BYTES,
            startup_time: Instant::now(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<ApiKey>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_default_state(mut self, state: impl Into<String>) -> Self {
        self.default_state = state.into();
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

/// Build application router
///
/// Health and build info are public; everything under `/api/verification`
/// and `/api/patta` goes through the API key middleware.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);
    let batch_limit = state
        .max_upload_bytes
        .saturating_mul(MAX_BATCH_FILES)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let protected = Router::new()
        .route(
            "/api/verification/upload_and_verify",
            post(api::upload_and_verify),
        )
        .route("/api/verification/verify_existing", post(api::verify_existing))
        .route(
            "/api/verification/get_verification_status/:verification_id",
            get(api::get_verification_status),
        )
        .route(
            "/api/verification/get_verification_history",
            get(api::get_verification_history),
        )
        .route(
            "/api/verification/get_supported_states",
            get(api::get_supported_states),
        )
        .route("/api/patta/upload", post(api::upload_and_extract))
        .route("/api/patta/validate", post(api::validate_extracted))
        .route(
            "/api/patta/batch-extract",
            post(api::batch_extract).layer(DefaultBodyLimit::max(batch_limit)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
