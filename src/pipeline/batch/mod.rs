//! Batch Extraction Pipeline
//!
//! Drives note units (or Q/A seeds) through the oracle and the parser and
//! accumulates an auditable result.
//!
//! ```text
//! Segmenter → FlashcardRunner → { Oracle → Parser } → PipelineResult
//! QaSeed[]  → SeedRunner      → { Oracle (batch-label) → Parser } → SeedRunResult
//! ```
//!
//! Per-unit problems never abort a run; they become `ExtractionFailure`
//! records. Only configuration errors are fatal, and they surface before any
//! oracle call.

pub mod error;
pub mod types;
pub mod runner;
pub mod seeds;

pub use error::ExtractionError;
pub use types::*;
pub use runner::{new_run_id, FlashcardRunner};
pub use seeds::SeedRunner;
