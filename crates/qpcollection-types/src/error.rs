use thiserror::Error;

use crate::backend_kind::BackendKind;

#[derive(Debug, Error)]
pub enum QpError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Unknown backend name: {0}")]
    UnknownBackendName(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(BackendKind),

    #[error("No backend available")]
    NoBackendAvailable,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, QpError>;
