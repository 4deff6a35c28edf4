//! Decision and validation layer
//!
//! - **decision** - tiered verification decision engine
//! - **field_validation** - validation of reviewer-submitted field values

pub mod decision;
pub mod field_validation;

pub use decision::{DecisionEngine, DocumentChecks};
pub use field_validation::{validate_extracted_data, ValidationReport};
