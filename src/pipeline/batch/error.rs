//! Fatal errors for a pipeline run.
//!
//! Only problems detected before any unit is processed surface here.
//! Per-unit problems become `ExtractionFailure` records instead.

use thiserror::Error;

use crate::pipeline::oracle::OracleError;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Oracle setup error: {0}")]
    Oracle(#[from] OracleError),
}
