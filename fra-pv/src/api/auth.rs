//! API key middleware
//!
//! Protected routes require the configured key in the `X-Api-Key` header.
//! With no key configured every request passes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use fra_common::api::API_KEY_HEADER;
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(key) = state.api_key.as_ref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = key.verify(provided) {
        warn!(path = %request.uri().path(), reason = %e, "Rejected unauthenticated request");
        return Err(ApiError::Unauthorized(e.to_string()));
    }

    Ok(next.run(request).await)
}
