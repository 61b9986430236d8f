//! Core types for the flashcard extraction pipeline.
//!
//! Lifecycle: NoteUnit → OracleRequest → OracleResponse → PipelineRecord → PipelineResult,
//! and for the seed variant: QaSeed → window request → NoteSample.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ExtractionError;
use crate::pipeline::oracle::{GenerationParams, PromptStyle};
use crate::pipeline::segmenter::NoteUnit;
use crate::pipeline::types::{ExtractionFailure, Flashcard, PipelineRecord};

// ═══════════════════════════════════════════
// Seed-driven variant
// ═══════════════════════════════════════════

/// A labelled question/answer pair used to ask the oracle for a study note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaSeed {
    pub question: String,
    pub answer: String,
}

impl QaSeed {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into().trim().to_string(),
            answer: answer.into().trim().to_string(),
        }
    }

    /// Seeds with a blank side are never sent to the oracle.
    pub fn is_usable(&self) -> bool {
        !self.question.trim().is_empty() && !self.answer.trim().is_empty()
    }
}

/// A synthesized study note paired with the seed it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSample {
    pub note: String,
    pub question: String,
    pub answer: String,
}

/// What to do with seeds whose label was missing from a window's response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Report them in `SeedRunResult::dropped` and move on.
    #[default]
    Drop,
    /// Re-issue a window of just the missing seeds, up to `max_attempts` extra calls.
    Retry { max_attempts: u32 },
    /// Append them once to the end of the queue.
    Requeue,
}

// ═══════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════

/// Settings consumed by the runners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub prompt_style: PromptStyle,
    pub params: GenerationParams,
    /// Stop issuing calls once this many successes exist. `None` = all units.
    pub target_count: Option<usize>,
    /// Seeds per batch-label request.
    pub window_size: usize,
    /// Output limit for a batch-label request. One note per seed needs far
    /// more room than a single flashcard.
    pub seed_max_output_tokens: u32,
    pub window_policy: WindowPolicy,
    /// Oracle calls in flight at once (concurrent runner only).
    pub max_concurrency: usize,
    /// Per-call deadline enforced by the concurrent runner.
    pub call_timeout_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            prompt_style: PromptStyle::default(),
            params: GenerationParams::default(),
            target_count: None,
            window_size: 25,
            seed_max_output_tokens: 500,
            window_policy: WindowPolicy::default(),
            max_concurrency: 1,
            call_timeout_ms: 120_000,
        }
    }
}

impl ExtractionConfig {
    /// Reject settings that would make a run meaningless. Runs before any unit.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.target_count == Some(0) {
            return Err(ExtractionError::Config("target_count must be at least 1".into()));
        }
        if self.window_size == 0 {
            return Err(ExtractionError::Config("window_size must be at least 1".into()));
        }
        if self.max_concurrency == 0 {
            return Err(ExtractionError::Config("max_concurrency must be at least 1".into()));
        }
        if self.call_timeout_ms == 0 {
            return Err(ExtractionError::Config("call_timeout_ms must be at least 1".into()));
        }
        if self.params.max_output_tokens == 0 {
            return Err(ExtractionError::Config("max_output_tokens must be at least 1".into()));
        }
        if self.seed_max_output_tokens == 0 {
            return Err(ExtractionError::Config(
                "seed_max_output_tokens must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.params.temperature) {
            return Err(ExtractionError::Config(format!(
                "temperature {} outside [0, 1]",
                self.params.temperature
            )));
        }
        if let Some(top_p) = self.params.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(ExtractionError::Config(format!("top_p {top_p} outside [0, 1]")));
            }
        }
        if self.params.top_k == Some(0) {
            return Err(ExtractionError::Config("top_k must be at least 1".into()));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════
// Progress Events
// ═══════════════════════════════════════════

/// Progress notification for callers driving a UI or log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    Started { unit_count: usize },
    Progress { completed: usize, total: usize },
    Completed { succeeded: usize, failed: usize, duration_ms: u64 },
}

// ═══════════════════════════════════════════
// Run Results
// ═══════════════════════════════════════════

/// Accounting for one flashcard run. Always returned, even under total oracle outage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    /// One record per attempted unit, in unit order.
    pub records: Vec<PipelineRecord>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Units never handed to the oracle because the target was reached.
    pub unconsumed: Vec<NoteUnit>,
    pub duration_ms: u64,
}

impl PipelineResult {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            records: Vec::new(),
            attempted: 0,
            succeeded: 0,
            failed: 0,
            unconsumed: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Append a record and update the counters.
    pub fn push(&mut self, record: PipelineRecord) {
        self.attempted += 1;
        if record.is_flashcard() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn flashcards(&self) -> impl Iterator<Item = &Flashcard> {
        self.records.iter().filter_map(PipelineRecord::as_flashcard)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExtractionFailure> {
        self.records.iter().filter_map(PipelineRecord::as_failure)
    }

    /// Share of attempted units that failed (0.0 when nothing was attempted).
    pub fn failure_rate(&self) -> f32 {
        if self.attempted == 0 {
            0.0
        } else {
            self.failed as f32 / self.attempted as f32
        }
    }
}

/// Accounting for one seed-driven run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedRunResult {
    pub run_id: String,
    pub samples: Vec<NoteSample>,
    /// Oracle calls issued, retries included.
    pub windows_issued: usize,
    /// Windows whose oracle call itself failed.
    pub windows_failed: usize,
    /// Seeds with a blank question or answer.
    pub seeds_skipped: usize,
    /// Seeds that ended without a note under the configured policy.
    pub dropped: Vec<QaSeed>,
    /// Seeds never sent because the target was reached.
    pub unconsumed: Vec<QaSeed>,
    pub duration_ms: u64,
}

impl SeedRunResult {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            samples: Vec::new(),
            windows_issued: 0,
            windows_failed: 0,
            seeds_skipped: 0,
            dropped: Vec::new(),
            unconsumed: Vec::new(),
            duration_ms: 0,
        }
    }
}
