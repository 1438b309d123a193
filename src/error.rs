//! Error types for the metrics service
//!
//! Every failure is classified into one of four kinds so the HTTP layer
//! can tell "bad input" apart from "not found" and "unexpected failure".

use thiserror::Error;

/// Service error
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Player or model identifier could not be resolved
    #[error("{0}")]
    NotFound(String),

    /// Missing parameters, malformed selections, schema mismatch
    #[error("{0}")]
    InvalidInput(String),

    /// Too few rows or classes to train on
    #[error("{0}")]
    DataQuality(String),

    #[error("{0}")]
    Unexpected(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    DataQuality,
    Unexpected,
}

impl MetricsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetricsError::NotFound(_) => ErrorKind::NotFound,
            MetricsError::InvalidInput(_) => ErrorKind::InvalidInput,
            MetricsError::DataQuality(_) => ErrorKind::DataQuality,
            _ => ErrorKind::Unexpected,
        }
    }

    /// HTTP status the serving layer reports for this error
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidInput | ErrorKind::DataQuality => 400,
            ErrorKind::Unexpected => 500,
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        MetricsError::InvalidInput(msg.into())
    }

    pub fn data_quality(msg: impl Into<String>) -> Self {
        MetricsError::DataQuality(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;
