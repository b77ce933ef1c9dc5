use thiserror::Error;

use crate::assets::branding::BrandingError;
use crate::capabilities::CapabilityError;
use crate::db::DatabaseError;
use crate::error::StorageError;

/// Errors surfaced by the generation service to its callers.
///
/// Failures inside a background run never reach the caller this way; they
/// are recorded on the presentation (`status = failed`, `error_message`).
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Presentation not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported language '{0}'")]
    UnsupportedLanguage(String),

    #[error("Invalid branding: {0}")]
    InvalidBranding(#[from] BrandingError),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("No async runtime available to run generation")]
    NoRuntime,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
