//! Error types for dataset preparation

use thiserror::Error;

/// Main error type for preparation operations
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::error::NiftiError),

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid BIDS dataset: {0}")]
    InvalidDataset(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid participant label {label}. Detected subjects: {available:?}")]
    UnknownParticipant {
        label: String,
        available: Vec<String>,
    },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Specialized Result type for preparation operations
pub type Result<T> = std::result::Result<T, PrepError>;

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        PrepError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PrepError {
    fn from(err: ndarray::ShapeError) -> Self {
        PrepError::InvalidDimensions(err.to_string())
    }
}
