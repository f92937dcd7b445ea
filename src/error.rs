//! Error taxonomy for the feature pipeline.
//!
//! Only configuration and I/O problems surface as hard failures. A malformed
//! input row is reported as [`PipelineError::MalformedRecord`] by the source
//! adapter, which drops and counts it rather than aborting the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn malformed(line: u64, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
