//! API module for shared HTTP API functionality
//!
//! Contains ONLY pure functions and shared types, no HTTP framework
//! dependencies. Each service wraps these in its own middleware.

pub mod auth;

pub use auth::{calculate_digest, ApiAuthError, ApiKey, API_KEY_HEADER};
