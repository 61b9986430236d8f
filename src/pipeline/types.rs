//! Output records of the extraction pipeline.
//!
//! Serialized shapes are what the persistence side consumes:
//! `{question, answer, source?}` for a card, `{source, raw_output, failed: true, ..}`
//! for a failure.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::oracle::OracleErrorKind;

/// A validated question/answer pair. Both fields are non-empty and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
    /// Note unit text the card was generated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Flashcard {
    /// Returns `None` unless both sides are non-empty after trimming.
    pub fn new(question: &str, answer: &str) -> Option<Self> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() || answer.is_empty() {
            return None;
        }
        Some(Self {
            question: question.to_string(),
            answer: answer.to_string(),
            source: None,
        })
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Why a unit produced no flashcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Adapter reported a network or service failure.
    OracleUnavailable,
    /// Oracle call exceeded its deadline and was abandoned.
    Timeout,
    /// Neither the strict pattern nor the fallback heuristic found a pair.
    ParseAmbiguous,
    /// Strict pattern matched but one side was empty after trimming.
    ParseMalformed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OracleUnavailable => "oracle_unavailable",
            Self::Timeout => "timeout",
            Self::ParseAmbiguous => "parse_ambiguous",
            Self::ParseMalformed => "parse_malformed",
        }
    }

    pub fn from_oracle(kind: Option<OracleErrorKind>) -> Self {
        match kind {
            Some(OracleErrorKind::Timeout) => Self::Timeout,
            _ => Self::OracleUnavailable,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit whose oracle output could not become a flashcard, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractionFailure {
    #[serde(default)]
    pub source: Option<String>,
    /// Oracle text verbatim, or the adapter's error message when the call failed.
    pub raw_output: String,
    pub kind: FailureKind,
}

impl ExtractionFailure {
    pub fn new(kind: FailureKind, raw_output: impl Into<String>) -> Self {
        Self {
            source: None,
            raw_output: raw_output.into(),
            kind,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Serialize for ExtractionFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ExtractionFailure", 4)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("raw_output", &self.raw_output)?;
        state.serialize_field("failed", &true)?;
        state.serialize_field("kind", &self.kind)?;
        state.end()
    }
}

/// Result of parsing one single-unit response.
pub type ParseOutcome = Result<Flashcard, ExtractionFailure>;

/// One entry of a pipeline result, in unit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineRecord {
    Flashcard(Flashcard),
    Failure(ExtractionFailure),
}

impl PipelineRecord {
    pub fn is_flashcard(&self) -> bool {
        matches!(self, Self::Flashcard(_))
    }

    pub fn as_flashcard(&self) -> Option<&Flashcard> {
        match self {
            Self::Flashcard(card) => Some(card),
            Self::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&ExtractionFailure> {
        match self {
            Self::Failure(failure) => Some(failure),
            Self::Flashcard(_) => None,
        }
    }
}

impl From<ParseOutcome> for PipelineRecord {
    fn from(outcome: ParseOutcome) -> Self {
        match outcome {
            Ok(card) => Self::Flashcard(card),
            Err(failure) => Self::Failure(failure),
        }
    }
}
