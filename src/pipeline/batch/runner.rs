//! FlashcardRunner: drives note units through oracle and parser.
//!
//! Sequential by default: one oracle call at a time, as local models are
//! single-threaded on CPU. `run_concurrent` keeps up to `max_concurrency`
//! calls in flight and still reports records in unit order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{FuturesOrdered, StreamExt};

use super::error::ExtractionError;
use super::types::*;
use crate::pipeline::oracle::{
    build_unit_request, Oracle, OracleErrorKind, OracleRequest, OracleResponse,
};
use crate::pipeline::parser::parse_flashcard;
use crate::pipeline::segmenter::NoteUnit;
use crate::pipeline::types::{ExtractionFailure, FailureKind, PipelineRecord};

/// Generate a unique run ID (UUID v4).
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Orchestrates a flashcard extraction run.
pub struct FlashcardRunner {
    config: ExtractionConfig,
}

impl FlashcardRunner {
    /// Fails on invalid configuration, before any unit is touched.
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractionError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn run(&self, units: Vec<NoteUnit>, oracle: &dyn Oracle) -> PipelineResult {
        self.run_with_progress(units, oracle, None)
    }

    /// Process units in order. Never aborts on a per-unit problem.
    pub fn run_with_progress(
        &self,
        units: Vec<NoteUnit>,
        oracle: &dyn Oracle,
        progress_fn: Option<&dyn Fn(RunEvent)>,
    ) -> PipelineResult {
        let start = Instant::now();
        let mut result = PipelineResult::new(new_run_id());
        let total = units.len();

        tracing::info!(
            run_id = %result.run_id,
            unit_count = total,
            target = ?self.config.target_count,
            "Starting flashcard run"
        );
        if let Some(progress) = progress_fn {
            progress(RunEvent::Started { unit_count: total });
        }

        let mut remaining = units.into_iter();
        while let Some(unit) = remaining.next() {
            if self.target_reached(result.succeeded) {
                result.unconsumed.push(unit);
                result.unconsumed.extend(remaining.by_ref());
                break;
            }

            if let Some(progress) = progress_fn {
                progress(RunEvent::Progress {
                    completed: result.attempted,
                    total,
                });
            }

            let request = self.request_for(&unit);
            let response = oracle.invoke(&request);
            result.push(self.record_for(&unit, response));
        }

        self.finish(&mut result, start, progress_fn);
        result
    }

    /// Like [`run`](Self::run) with bounded concurrency and a per-call deadline.
    ///
    /// Each call runs on the blocking pool. A call that outlives
    /// `call_timeout_ms` is abandoned and recorded as a timeout. A new call
    /// is only issued while successes plus calls in flight stay below the
    /// target, so every issued call is recorded and never more than the
    /// target succeed. Records come back in unit order.
    pub async fn run_concurrent(
        &self,
        units: Vec<NoteUnit>,
        oracle: Arc<dyn Oracle>,
    ) -> PipelineResult {
        let start = Instant::now();
        let mut result = PipelineResult::new(new_run_id());
        let deadline = Duration::from_millis(self.config.call_timeout_ms);
        let limit = self.config.max_concurrency;

        tracing::info!(
            run_id = %result.run_id,
            unit_count = units.len(),
            max_concurrency = limit,
            target = ?self.config.target_count,
            "Starting concurrent flashcard run"
        );

        let call = |unit: NoteUnit| {
            let oracle = Arc::clone(&oracle);
            let request = self.request_for(&unit);
            async move {
                let response = invoke_with_deadline(oracle, request, deadline).await;
                (unit, response)
            }
        };

        let mut pending = units.iter().cloned();
        let mut in_flight = FuturesOrdered::new();
        loop {
            while in_flight.len() < limit && self.may_issue(result.succeeded, in_flight.len()) {
                match pending.next() {
                    Some(unit) => in_flight.push_back(call(unit)),
                    None => break,
                }
            }

            match in_flight.next().await {
                Some((unit, response)) => result.push(self.record_for(&unit, response)),
                None => break,
            }
        }

        result.unconsumed = units[result.attempted..].to_vec();
        self.finish(&mut result, start, None);
        result
    }

    /// Whether another call may start with `in_flight` calls still outstanding.
    fn may_issue(&self, succeeded: usize, in_flight: usize) -> bool {
        self.config
            .target_count
            .map_or(true, |target| succeeded + in_flight < target)
    }

    fn target_reached(&self, succeeded: usize) -> bool {
        self.config
            .target_count
            .is_some_and(|target| succeeded >= target)
    }

    fn request_for(&self, unit: &NoteUnit) -> OracleRequest {
        build_unit_request(&unit.text, self.config.prompt_style, &self.config.params)
    }

    /// Turn one oracle response into a record. Oracle and parse failures are both contained here.
    fn record_for(&self, unit: &NoteUnit, response: OracleResponse) -> PipelineRecord {
        if !response.is_success() {
            let kind = FailureKind::from_oracle(response.error_kind);
            let message = response
                .error_message
                .unwrap_or_else(|| "oracle call failed".to_string());
            tracing::warn!(
                unit_index = unit.index,
                kind = kind.as_str(),
                error = %message,
                "Oracle call failed, recording failure"
            );
            return PipelineRecord::Failure(
                ExtractionFailure::new(kind, message).with_source(unit.text.clone()),
            );
        }

        let prepared = self.config.prompt_style.prepare_response(&response.text);
        match parse_flashcard(&prepared) {
            Ok(card) => PipelineRecord::Flashcard(card.with_source(unit.text.clone())),
            Err(failure) => {
                tracing::warn!(
                    unit_index = unit.index,
                    kind = failure.kind.as_str(),
                    "Failed to parse oracle response, recording failure"
                );
                PipelineRecord::Failure(
                    ExtractionFailure::new(failure.kind, response.text)
                        .with_source(unit.text.clone()),
                )
            }
        }
    }

    fn finish(
        &self,
        result: &mut PipelineResult,
        start: Instant,
        progress_fn: Option<&dyn Fn(RunEvent)>,
    ) {
        result.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            run_id = %result.run_id,
            attempted = result.attempted,
            succeeded = result.succeeded,
            failed = result.failed,
            unconsumed = result.unconsumed.len(),
            duration_ms = result.duration_ms,
            "Flashcard run finished"
        );
        if let Some(progress) = progress_fn {
            progress(RunEvent::Completed {
                succeeded: result.succeeded,
                failed: result.failed,
                duration_ms: result.duration_ms,
            });
        }
    }
}

/// One oracle call on the blocking pool, abandoned after `deadline`.
async fn invoke_with_deadline(
    oracle: Arc<dyn Oracle>,
    request: OracleRequest,
    deadline: Duration,
) -> OracleResponse {
    let call = tokio::task::spawn_blocking(move || oracle.invoke(&request));
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => OracleResponse::failure(
            OracleErrorKind::Unavailable,
            format!("oracle task failed: {e}"),
        ),
        Err(_) => OracleResponse::failure(
            OracleErrorKind::Timeout,
            format!("oracle call abandoned after {}ms", deadline.as_millis()),
        ),
    }
}
