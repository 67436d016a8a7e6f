//! Error taxonomy for the weather ETL job.
//!
//! Every operation returns one of these. Only [`EtlError::ConfigMissing`] is
//! fatal to a pipeline run; the rest are soft failures that the orchestrator
//! logs and skips.

use thiserror::Error;

/// Errors produced by extract, transform and load operations.
#[derive(Debug, Error)]
pub enum EtlError {
    /// A required configuration value is absent
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    /// The provider (or source file) could not be read
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// A payload lacked a required key or column
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The local store rejected an operation
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl EtlError {
    /// True when the error must abort the current run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EtlError::ConfigMissing(_))
    }
}

impl From<sqlx::Error> for EtlError {
    fn from(e: sqlx::Error) -> Self {
        EtlError::StorageFailure(e.to_string())
    }
}

impl From<reqwest::Error> for EtlError {
    fn from(e: reqwest::Error) -> Self {
        EtlError::TransportFailure(e.to_string())
    }
}

impl From<std::io::Error> for EtlError {
    fn from(e: std::io::Error) -> Self {
        EtlError::StorageFailure(e.to_string())
    }
}

impl From<csv::Error> for EtlError {
    fn from(e: csv::Error) -> Self {
        EtlError::TransportFailure(format!("CSV source: {e}"))
    }
}
