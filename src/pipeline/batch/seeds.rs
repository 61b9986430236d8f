//! SeedRunner: synthesizes study notes from labelled Q/A seeds.
//!
//! Seeds are grouped into fixed-size windows, one batch-label oracle call per
//! window. Labels found in the response become [`NoteSample`]s; what happens
//! to seeds whose label is missing is decided by [`WindowPolicy`].

use std::collections::VecDeque;
use std::time::Instant;

use super::error::ExtractionError;
use super::runner::new_run_id;
use super::types::*;
use crate::pipeline::oracle::{build_seed_request, GenerationParams, Oracle};
use crate::pipeline::parser::{parse_response, ParsedResponse};

/// A queued seed and whether it already went back to the queue once.
#[derive(Debug, Clone)]
struct Pending {
    seed: QaSeed,
    requeued: bool,
}

pub struct SeedRunner {
    config: ExtractionConfig,
}

impl SeedRunner {
    /// Fails on invalid configuration, before any seed is touched.
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractionError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Process all seeds window by window. Never aborts on a window failure.
    pub fn run(&self, seeds: Vec<QaSeed>, oracle: &dyn Oracle) -> SeedRunResult {
        let start = Instant::now();
        let mut result = SeedRunResult::new(new_run_id());

        let mut queue: VecDeque<Pending> = VecDeque::with_capacity(seeds.len());
        for seed in seeds {
            // Seeds deserialized from JSON skip the trimming constructor.
            let seed = QaSeed::new(seed.question, seed.answer);
            if seed.is_usable() {
                queue.push_back(Pending {
                    seed,
                    requeued: false,
                });
            } else {
                result.seeds_skipped += 1;
            }
        }

        tracing::info!(
            run_id = %result.run_id,
            seed_count = queue.len(),
            skipped = result.seeds_skipped,
            window_size = self.config.window_size,
            policy = ?self.config.window_policy,
            "Starting seed run"
        );

        while !queue.is_empty() {
            if self.target_reached(&result) {
                result.unconsumed = queue.drain(..).map(|p| p.seed).collect();
                break;
            }

            let take = self.config.window_size.min(queue.len());
            let window: Vec<Pending> = queue.drain(..take).collect();
            let missing = self.process_window(window, oracle, &mut result);
            if missing.is_empty() {
                continue;
            }

            match self.config.window_policy {
                WindowPolicy::Drop | WindowPolicy::Retry { .. } => {
                    self.drop_seeds(missing, &mut result);
                }
                WindowPolicy::Requeue => {
                    let (again, exhausted): (Vec<Pending>, Vec<Pending>) =
                        missing.into_iter().partition(|p| !p.requeued);
                    if !again.is_empty() {
                        tracing::debug!(count = again.len(), "Requeueing seeds without a note");
                    }
                    queue.extend(again.into_iter().map(|p| Pending {
                        seed: p.seed,
                        requeued: true,
                    }));
                    self.drop_seeds(exhausted, &mut result);
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            run_id = %result.run_id,
            samples = result.samples.len(),
            windows = result.windows_issued,
            windows_failed = result.windows_failed,
            dropped = result.dropped.len(),
            unconsumed = result.unconsumed.len(),
            duration_ms = result.duration_ms,
            "Seed run finished"
        );
        result
    }

    /// Sampling settings of the run with the window-sized output limit.
    fn seed_params(&self) -> GenerationParams {
        GenerationParams {
            max_output_tokens: self.config.seed_max_output_tokens,
            ..self.config.params.clone()
        }
    }

    fn target_reached(&self, result: &SeedRunResult) -> bool {
        self.config
            .target_count
            .is_some_and(|target| result.samples.len() >= target)
    }

    /// Issue one window, plus retries under `WindowPolicy::Retry`. Returns seeds still without a note.
    fn process_window(
        &self,
        window: Vec<Pending>,
        oracle: &dyn Oracle,
        result: &mut SeedRunResult,
    ) -> Vec<Pending> {
        let retries = match self.config.window_policy {
            WindowPolicy::Retry { max_attempts } => max_attempts,
            WindowPolicy::Drop | WindowPolicy::Requeue => 0,
        };

        let mut missing = self.issue_window(window, oracle, result);
        let mut attempts = 0;
        while !missing.is_empty() && attempts < retries && !self.target_reached(result) {
            attempts += 1;
            tracing::debug!(count = missing.len(), attempt = attempts, "Retrying seeds without a note");
            missing = self.issue_window(missing, oracle, result);
        }
        missing
    }

    /// One batch-label call. Found labels become samples; the rest is returned.
    fn issue_window(
        &self,
        window: Vec<Pending>,
        oracle: &dyn Oracle,
        result: &mut SeedRunResult,
    ) -> Vec<Pending> {
        let seeds: Vec<QaSeed> = window.iter().map(|p| p.seed.clone()).collect();
        let request = build_seed_request(&seeds, &self.seed_params());
        result.windows_issued += 1;

        let response = oracle.invoke(&request);
        if !response.is_success() {
            result.windows_failed += 1;
            tracing::warn!(
                window_len = window.len(),
                error = response.error_message.as_deref().unwrap_or("unknown"),
                "Oracle call failed for seed window"
            );
            return window;
        }

        let notes = match parse_response(&response.text, request.shape) {
            ParsedResponse::Labels(notes) => notes,
            ParsedResponse::Card(_) => vec![None; window.len()],
        };

        let mut missing = Vec::new();
        for (pending, note) in window.into_iter().zip(notes) {
            match note.filter(|n| !n.is_empty()) {
                Some(note) => result.samples.push(NoteSample {
                    note,
                    question: pending.seed.question,
                    answer: pending.seed.answer,
                }),
                None => missing.push(pending),
            }
        }

        tracing::debug!(
            window_len = seeds.len(),
            found = seeds.len() - missing.len(),
            "Seed window label coverage"
        );
        missing
    }

    fn drop_seeds(&self, seeds: Vec<Pending>, result: &mut SeedRunResult) {
        if seeds.is_empty() {
            return;
        }
        tracing::warn!(count = seeds.len(), "Dropping seeds without a labelled note");
        result.dropped.extend(seeds.into_iter().map(|p| p.seed));
    }
}
