//! Oracle Adapter: the single point where the pipeline talks to a
//! generative text service.
//!
//! Transport failures are typed as [`OracleError`] inside adapters but never
//! cross [`Oracle::invoke`]; they come back as a failed [`OracleResponse`].

pub mod types;
pub mod prompt;
pub mod ollama;

pub use types::*;
pub use prompt::*;
pub use ollama::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle is not reachable at {0}")]
    Connection(String),

    #[error("Oracle request timed out after {0}s")]
    Timeout(u64),

    #[error("Oracle returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl OracleError {
    pub fn kind(&self) -> OracleErrorKind {
        match self {
            Self::Connection(_) | Self::HttpClient(_) => OracleErrorKind::Unavailable,
            Self::Timeout(_) => OracleErrorKind::Timeout,
            Self::Service { .. } => OracleErrorKind::Service,
            Self::ResponseParsing(_) => OracleErrorKind::Malformed,
        }
    }
}
