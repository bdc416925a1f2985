//! Error types for the credit-default experiment

use thiserror::Error;

/// Result type alias for experiment operations
pub type Result<T> = std::result::Result<T, CreditError>;

/// Main error type for the experiment pipeline
#[derive(Error, Debug)]
pub enum CreditError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Resampling error: {0}")]
    ResamplingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<polars::error::PolarsError> for CreditError {
    fn from(err: polars::error::PolarsError) -> Self {
        CreditError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for CreditError {
    fn from(err: serde_json::Error) -> Self {
        CreditError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for CreditError {
    fn from(err: ndarray::ShapeError) -> Self {
        CreditError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
