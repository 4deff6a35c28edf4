//! # FRA Common Library
//!
//! Shared code for the FRA land-claim services including:
//! - Error type and result alias
//! - Configuration loading (CLI → ENV → TOML → compiled defaults)
//! - API key authentication helpers
//! - Timestamp utilities

pub mod api;
pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
