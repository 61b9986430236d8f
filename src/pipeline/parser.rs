//! Oracle response parsing.
//!
//! Single-unit responses go through a strict `Q:`/`A:` pattern first and a
//! line heuristic second. Batch-label responses are scanned for `N{i}:`
//! lines. Both share the same sanitation and label normalization.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use super::oracle::ResponseShape;
use super::types::{ExtractionFailure, FailureKind, Flashcard, ParseOutcome};

/// `Q:` (or full-width colon) .. `A:` .. end, case-insensitive, across lines.
static QA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Q[:\x{FF1A}]\s*(.*?)\s*A[:\x{FF1A}]\s*(.*)").expect("valid regex")
});

static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^```\w*\s*$").expect("valid regex"));

/// Parsed form of a response, tagged by the shape that was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    Card(ParseOutcome),
    /// One slot per label `N1..=Nn`; `None` where the label was absent.
    Labels(Vec<Option<String>>),
}

/// Parse `raw` according to `shape`.
pub fn parse_response(raw: &str, shape: ResponseShape) -> ParsedResponse {
    match shape {
        ResponseShape::SingleUnit => ParsedResponse::Card(parse_flashcard(raw)),
        ResponseShape::BatchLabel { count } => ParsedResponse::Labels(parse_batch(raw, count)),
    }
}

/// Strip model artifacts: reasoning blocks and markdown fence lines.
pub fn sanitize_response(raw: &str) -> Cow<'_, str> {
    if !raw.contains("<think>") && !raw.contains("```") {
        return Cow::Borrowed(raw);
    }
    let text = THINK_RE.replace_all(raw, "");
    let text = FENCE_RE.replace_all(&text, "");
    Cow::Owned(text.into_owned())
}

/// Map long-form labels onto the short ones. Case-sensitive literal replace.
pub fn normalize_labels(text: &str) -> String {
    text.replace("Answer:", "A:").replace("Question:", "Q:")
}

/// Shared normalization for both response shapes.
fn normalize(raw: &str) -> String {
    normalize_labels(&sanitize_response(raw))
}

/// Extract one flashcard from a single-unit response.
///
/// Failures keep `raw` verbatim. Pure: the same input always gives the same outcome.
pub fn parse_flashcard(raw: &str) -> ParseOutcome {
    let text = normalize(raw);

    if let Some(caps) = QA_RE.captures(&text) {
        let question = caps.get(1).map_or("", |m| m.as_str());
        let answer = caps.get(2).map_or("", |m| m.as_str());
        return Flashcard::new(question, answer)
            .ok_or_else(|| ExtractionFailure::new(FailureKind::ParseMalformed, raw));
    }

    fallback_pair(&text).ok_or_else(|| ExtractionFailure::new(FailureKind::ParseAmbiguous, raw))
}

/// First line ending in `?` is the question; first other line longer than
/// one character is the answer.
fn fallback_pair(text: &str) -> Option<Flashcard> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let question = lines.iter().find(|line| line.ends_with('?'))?;
    let answer = lines
        .iter()
        .find(|line| !line.ends_with('?') && line.chars().count() > 1)?;
    Flashcard::new(question, answer)
}

/// Extract labelled notes `N1:` ..= `N{count}:` from a batch-label response.
///
/// A missing label yields `None` at that slot; partial coverage is expected.
pub fn parse_batch(raw: &str, count: usize) -> Vec<Option<String>> {
    let text = normalize(raw);
    let lines: Vec<&str> = text.lines().collect();

    (1..=count)
        .map(|i| {
            let label = format!("N{i}:");
            lines
                .iter()
                .find(|line| line.starts_with(&label))
                .map(|line| line[label.len()..].trim().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(outcome: ParseOutcome) -> Flashcard {
        outcome.expect("expected a flashcard")
    }

    #[test]
    fn strict_pattern_extracts_pair() {
        let c = card(parse_flashcard("Q: What boils at 100C?\nA: Water."));
        assert_eq!(c.question, "What boils at 100C?");
        assert_eq!(c.answer, "Water.");
        assert!(c.source.is_none());
    }

    #[test]
    fn long_labels_are_normalized() {
        let c = card(parse_flashcard("Question: Who wrote Hamlet?\nAnswer: Shakespeare"));
        assert_eq!(c.question, "Who wrote Hamlet?");
        assert_eq!(c.answer, "Shakespeare");
    }

    #[test]
    fn reversed_order_recovers_through_fallback() {
        // Normalized to "A: Paris.\nQ: Capital of France?". Nothing follows Q:,
        // so the strict pattern misses and the line heuristic takes over.
        let c = card(parse_flashcard("Answer: Paris.\nQuestion: Capital of France?"));
        assert_eq!(c.question, "Q: Capital of France?");
        assert_eq!(c.answer, "A: Paris.");
    }

    #[test]
    fn no_markers_is_ambiguous_with_raw_preserved() {
        let failure = parse_flashcard("random text no markers").unwrap_err();
        assert_eq!(failure.kind, FailureKind::ParseAmbiguous);
        assert_eq!(failure.raw_output, "random text no markers");
        assert!(failure.source.is_none());
    }

    #[test]
    fn empty_answer_is_malformed() {
        let failure = parse_flashcard("Q: What is osmosis?\nA:   ").unwrap_err();
        assert_eq!(failure.kind, FailureKind::ParseMalformed);
        assert_eq!(failure.raw_output, "Q: What is osmosis?\nA:   ");
    }

    #[test]
    fn empty_question_is_malformed() {
        let failure = parse_flashcard("Q:\nA: Something").unwrap_err();
        assert_eq!(failure.kind, FailureKind::ParseMalformed);
    }

    #[test]
    fn markers_are_case_insensitive() {
        let c = card(parse_flashcard("q: lower case works?\na: yes"));
        assert_eq!(c.question, "lower case works?");
        assert_eq!(c.answer, "yes");
    }

    #[test]
    fn full_width_colons_match() {
        let c = card(parse_flashcard("Q\u{FF1A}光速は？\nA\u{FF1A}秒速30万km"));
        assert_eq!(c.question, "光速は？");
        assert_eq!(c.answer, "秒速30万km");
    }

    #[test]
    fn answer_spans_remaining_lines() {
        let c = card(parse_flashcard("Q: Name two noble gases?\nA: Helium\nand neon."));
        assert_eq!(c.answer, "Helium\nand neon.");
    }

    #[test]
    fn leading_chatter_before_markers_is_ignored() {
        let c = card(parse_flashcard("Sure! Here is a card.\nQ: What is 2+2?\nA: 4"));
        assert_eq!(c.question, "What is 2+2?");
        assert_eq!(c.answer, "4");
    }

    #[test]
    fn fallback_takes_first_question_and_first_statement() {
        let raw = "x\nWhat is the speed of light?\nAbout 300,000 km/s.\nWhy is the sky blue?";
        let c = card(parse_flashcard(raw));
        assert_eq!(c.question, "What is the speed of light?");
        assert_eq!(c.answer, "About 300,000 km/s.");
    }

    #[test]
    fn fallback_without_statement_line_fails() {
        let failure = parse_flashcard("Is this a question?\nAnother one?").unwrap_err();
        assert_eq!(failure.kind, FailureKind::ParseAmbiguous);
    }

    #[test]
    fn thinking_block_is_stripped() {
        let c = card(parse_flashcard(
            "<think>Q: draft?\nA: draft</think>\nQ: What is DNA?\nA: Genetic material.",
        ));
        assert_eq!(c.question, "What is DNA?");
        assert_eq!(c.answer, "Genetic material.");
    }

    #[test]
    fn code_fences_are_stripped() {
        let c = card(parse_flashcard("```\nQ: Unit of force?\nA: Newton\n```"));
        assert_eq!(c.answer, "Newton");
    }

    #[test]
    fn parse_is_idempotent() {
        for raw in ["Q: a?\nA: b", "random text no markers", "Answer: x\nQuestion: y?"] {
            assert_eq!(parse_flashcard(raw), parse_flashcard(raw));
        }
    }

    #[test]
    fn batch_labels_extracted_by_index() {
        let raw = "N1: Paris is the capital of France.\nN3:   Jupiter is the largest planet.  \nN2: Water boils at 100C.";
        let notes = parse_batch(raw, 3);
        assert_eq!(
            notes,
            vec![
                Some("Paris is the capital of France.".to_string()),
                Some("Water boils at 100C.".to_string()),
                Some("Jupiter is the largest planet.".to_string()),
            ]
        );
    }

    #[test]
    fn batch_missing_labels_are_none() {
        let notes = parse_batch("Here you go:\nN2: only the second", 3);
        assert_eq!(notes, vec![None, Some("only the second".to_string()), None]);
    }

    #[test]
    fn batch_label_must_start_line() {
        let notes = parse_batch("  N1: indented\nsee N1: inline", 1);
        assert_eq!(notes, vec![None]);
    }

    #[test]
    fn batch_label_does_not_confuse_n1_with_n10() {
        let notes = parse_batch("N10: tenth\nN1: first", 10);
        assert_eq!(notes[0].as_deref(), Some("first"));
        assert_eq!(notes[9].as_deref(), Some("tenth"));
    }

    #[test]
    fn batch_first_matching_line_wins() {
        let notes = parse_batch("N1: first\nN1: second", 1);
        assert_eq!(notes, vec![Some("first".to_string())]);
    }

    #[test]
    fn parse_response_dispatches_on_shape() {
        match parse_response("Q: a?\nA: b", ResponseShape::SingleUnit) {
            ParsedResponse::Card(Ok(c)) => assert_eq!(c.answer, "b"),
            other => panic!("unexpected {other:?}"),
        }
        match parse_response("N1: note", ResponseShape::BatchLabel { count: 2 }) {
            ParsedResponse::Labels(labels) => assert_eq!(labels.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
