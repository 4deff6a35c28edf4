//! API key authentication
//!
//! The key is supplied by configuration (CLI, ENV or TOML) and kept only as
//! a SHA-256 digest. Requests present it in the `X-Api-Key` header. When no
//! key is configured, authentication is disabled.

use sha2::{Digest, Sha256};
use std::fmt;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authentication error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiAuthError {
    /// Header missing from request
    MissingKey,
    /// Header present but digest does not match
    InvalidKey,
}

impl fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiAuthError::MissingKey => write!(f, "Missing API key"),
            ApiAuthError::InvalidKey => write!(f, "Invalid API key"),
        }
    }
}

impl std::error::Error for ApiAuthError {}

/// SHA-256 digest of a secret
pub fn calculate_digest(secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}

/// Configured API key (digest only)
#[derive(Clone)]
pub struct ApiKey {
    digest: [u8; 32],
}

impl ApiKey {
    /// Returns `None` for blank secrets, which disables authentication
    pub fn new(secret: &str) -> Option<Self> {
        let secret = secret.trim();
        if secret.is_empty() {
            return None;
        }
        Some(Self {
            digest: calculate_digest(secret),
        })
    }

    /// Check a presented key
    ///
    /// Digests are compared over all 32 bytes regardless of where they differ.
    pub fn verify(&self, provided: Option<&str>) -> Result<(), ApiAuthError> {
        let provided = provided.ok_or(ApiAuthError::MissingKey)?;
        let candidate = calculate_digest(provided.trim());

        let diff = self
            .digest
            .iter()
            .zip(candidate.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));

        if diff == 0 {
            Ok(())
        } else {
            Err(ApiAuthError::InvalidKey)
        }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_disables_auth() {
        assert!(ApiKey::new("").is_none());
        assert!(ApiKey::new("   ").is_none());
    }

    #[test]
    fn test_verify_accepts_matching_key() {
        let key = ApiKey::new("s3cret").unwrap();
        assert_eq!(key.verify(Some("s3cret")), Ok(()));
        assert_eq!(key.verify(Some(" s3cret ")), Ok(()));
    }

    #[test]
    fn test_verify_rejects_missing_and_wrong_key() {
        let key = ApiKey::new("s3cret").unwrap();
        assert_eq!(key.verify(None), Err(ApiAuthError::MissingKey));
        assert_eq!(key.verify(Some("guess")), Err(ApiAuthError::InvalidKey));
    }

    #[test]
    fn test_debug_does_not_leak_digest() {
        let key = ApiKey::new("s3cret").unwrap();
        assert_eq!(format!("{:?}", key), "ApiKey(<redacted>)");
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(calculate_digest("abc"), calculate_digest("abc"));
        assert_ne!(calculate_digest("abc"), calculate_digest("abd"));
    }
}
