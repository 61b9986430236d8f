//! Transcript processing orchestrator.
//!
//! Single entry point that drives the full transcript pipeline:
//! clean preamble → segment into note units → extract flashcards.
//!
//! The oracle is injected behind the [`Oracle`] trait so the orchestrator
//! stays testable with a scripted implementation.

use std::sync::Arc;

use crate::config::FlashnoteConfig;
use crate::pipeline::batch::{ExtractionError, FlashcardRunner, PipelineResult, RunEvent};
use crate::pipeline::oracle::Oracle;
use crate::pipeline::preamble::clean_transcript;
use crate::pipeline::segmenter::{NoteUnit, Segmenter};

/// Clean and segment a transcript. No oracle involved.
pub fn prepare_units(transcript: &str, config: &FlashnoteConfig) -> Vec<NoteUnit> {
    let cleaned = clean_transcript(transcript, &config.preamble);
    let units = Segmenter::new(config.segmenter.clone()).segment(&cleaned);
    tracing::debug!(
        raw_len = transcript.len(),
        cleaned_len = cleaned.len(),
        units = units.len(),
        "Transcript prepared"
    );
    units
}

/// Run a transcript through the whole pipeline, one oracle call at a time.
///
/// Only configuration problems are returned as errors; per-unit failures
/// are inside the result.
pub fn process_transcript(
    transcript: &str,
    config: &FlashnoteConfig,
    oracle: &dyn Oracle,
) -> Result<PipelineResult, ExtractionError> {
    process_transcript_with_progress(transcript, config, oracle, None)
}

pub fn process_transcript_with_progress(
    transcript: &str,
    config: &FlashnoteConfig,
    oracle: &dyn Oracle,
    progress_fn: Option<&dyn Fn(RunEvent)>,
) -> Result<PipelineResult, ExtractionError> {
    config.validate()?;
    let runner = FlashcardRunner::new(config.extraction_config())?;
    let units = prepare_units(transcript, config);
    Ok(runner.run_with_progress(units, oracle, progress_fn))
}

/// Concurrent variant, bounded by `max_concurrency`.
pub async fn process_transcript_concurrent(
    transcript: &str,
    config: &FlashnoteConfig,
    oracle: Arc<dyn Oracle>,
) -> Result<PipelineResult, ExtractionError> {
    config.validate()?;
    let runner = FlashcardRunner::new(config.extraction_config())?;
    let units = prepare_units(transcript, config);
    Ok(runner.run_concurrent(units, oracle).await)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::pipeline::oracle::ScriptedOracle;
    use crate::pipeline::types::FailureKind;

    const TRANSCRIPT: &str = "Here is the extracted text:\n\
        - Mitochondria produce ATP\n\
        through respiration\n\
        \n\
        2) The Treaty of Westphalia was signed in 1648\n";

    #[test]
    fn prepare_strips_preamble_and_segments() {
        let units = prepare_units(TRANSCRIPT, &FlashnoteConfig::default());
        let texts: Vec<&str> = units.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Mitochondria produce ATP through respiration",
                "The Treaty of Westphalia was signed in 1648",
            ]
        );
    }

    #[test]
    fn transcript_to_flashcards() {
        let oracle = ScriptedOracle::with_texts([
            "Q: What produces ATP?\nA: Mitochondria.",
            "no markers at all",
        ]);

        let result = process_transcript(TRANSCRIPT, &FlashnoteConfig::default(), &oracle).unwrap();

        assert_eq!(result.attempted, 2);
        assert_eq!(result.succeeded, 1);
        let card = result.records[0].as_flashcard().unwrap();
        assert_eq!(card.answer, "Mitochondria.");
        assert_eq!(
            card.source.as_deref(),
            Some("Mitochondria produce ATP through respiration")
        );
        let failure = result.records[1].as_failure().unwrap();
        assert_eq!(failure.kind, FailureKind::ParseAmbiguous);
    }

    #[test]
    fn invalid_config_fails_before_oracle() {
        let oracle = ScriptedOracle::default();
        let config = FlashnoteConfig {
            window_size: 0,
            ..FlashnoteConfig::default()
        };
        let err = process_transcript(TRANSCRIPT, &config, &oracle).unwrap_err();
        assert!(matches!(err, ExtractionError::Config(_)));
        assert_eq!(oracle.call_count(), 0);
    }

    #[test]
    fn empty_transcript_makes_no_calls() {
        let oracle = ScriptedOracle::default();
        let result = process_transcript("  \n\n", &FlashnoteConfig::default(), &oracle).unwrap();
        assert!(result.is_empty());
        assert_eq!(oracle.call_count(), 0);
    }

    #[test]
    fn progress_is_forwarded() {
        let oracle = ScriptedOracle::with_texts(["Q: a?\nA: b", "Q: c?\nA: d"]);
        let events = RefCell::new(Vec::new());
        let record = |e: RunEvent| events.borrow_mut().push(e);

        process_transcript_with_progress(
            TRANSCRIPT,
            &FlashnoteConfig::default(),
            &oracle,
            Some(&record),
        )
        .unwrap();

        let events = events.into_inner();
        assert_eq!(events.first(), Some(&RunEvent::Started { unit_count: 2 }));
        assert!(matches!(
            events.last(),
            Some(RunEvent::Completed { succeeded: 2, .. })
        ));
    }

    #[tokio::test]
    async fn concurrent_processing_matches_sequential_accounting() {
        let oracle: Arc<dyn Oracle> = Arc::new(ScriptedOracle::with_texts([
            "Q: x?\nA: y",
            "Q: z?\nA: w",
        ]));
        let config = FlashnoteConfig {
            max_concurrency: 2,
            ..FlashnoteConfig::default()
        };

        let result = process_transcript_concurrent(TRANSCRIPT, &config, oracle)
            .await
            .unwrap();

        assert_eq!(result.attempted, 2);
        assert_eq!(result.succeeded, 2);
    }
}
