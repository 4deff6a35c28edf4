//! Services: registry lookups, document checks, upload storage and the
//! verification pipeline

pub mod authentication;
pub mod encumbrance;
pub mod gis;
pub mod portal;
pub mod uploads;
pub mod verification;

pub use authentication::inspect_document;
pub use encumbrance::{cross_validate, EncumbranceRecord};
pub use gis::{verify_coordinates, LatLon};
pub use portal::{
    compare_portal_data, find_portal, verify_with_portal, HttpPortal, PortalClient, PortalError,
    SimulatedPortal, StatePortal, SUPPORTED_STATES,
};
pub use uploads::{allowed_file, secure_filename, StoredFile, UploadStore, ALLOWED_EXTENSIONS};
pub use verification::VerificationService;
