//! Transcript preamble stripping.
//!
//! Transcription models like to open with "Sure, here is the extracted text:".
//! Everything up to and including the first line that contains a denylisted
//! phrase is dropped. Without a hit, markdown fences and a leading
//! "extracted text:" style header are removed instead.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^```(?:\w+)?|```$").expect("valid regex"));

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^.*?(?:generated|transcribed|extracted) (?:text|content):")
        .expect("valid regex")
});

/// Denylist of known preamble sentences. Matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreambleConfig {
    pub drop_phrases: Vec<String>,
}

impl Default for PreambleConfig {
    fn default() -> Self {
        let phrases = [
            "Sure, here is the extracted text",
            "Here is the extracted text",
            "Below is the extracted text",
            "This is what the note says",
            "The handwritten note contains the following text",
            "Generated text:",
            "Transcribed content:",
            "Sure, here's the extracted text and converted notation from the handwritten image:",
            "Sure! Here's the extracted text with mathematical notation converted to plain descriptive text:",
            "Certainly! Here's the transcription and conversion:",
            "Certainly! Here is the text extracted and converted:",
            "Sure, here\u{2019}s the text extracted from the handwritten note:",
        ];
        Self {
            drop_phrases: phrases.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Remove transcription preamble from `raw` according to `config`.
pub fn clean_transcript(raw: &str, config: &PreambleConfig) -> String {
    let phrases: Vec<String> = config
        .drop_phrases
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.to_lowercase())
        .collect();

    let lines: Vec<&str> = raw.trim().lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let lowered = line.to_lowercase();
        if phrases.iter().any(|p| lowered.contains(p.as_str())) {
            tracing::debug!(line = i, "Dropping transcript preamble");
            return lines[i + 1..].join("\n").trim().to_string();
        }
    }

    let without_fences = CODE_FENCE_RE.replace_all(raw, "");
    let without_header = HEADER_RE.replace(&without_fences, "");
    without_header.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_everything_through_matching_line() {
        let raw = "Sure, here is the extracted text:\n\n- Mitosis has four phases\n- Prophase is first";
        let cleaned = clean_transcript(raw, &PreambleConfig::default());
        assert_eq!(cleaned, "- Mitosis has four phases\n- Prophase is first");
    }

    #[test]
    fn phrase_match_is_case_insensitive() {
        let raw = "HERE IS THE EXTRACTED TEXT from your image\nNewton's first law";
        let cleaned = clean_transcript(raw, &PreambleConfig::default());
        assert_eq!(cleaned, "Newton's first law");
    }

    #[test]
    fn curly_apostrophe_phrase_matches() {
        let raw = "Sure, here\u{2019}s the text extracted from the handwritten note:\nOsmosis";
        assert_eq!(clean_transcript(raw, &PreambleConfig::default()), "Osmosis");
    }

    #[test]
    fn strips_code_fences_without_phrase() {
        let raw = "```text\nThe heart has four chambers\n```";
        let cleaned = clean_transcript(raw, &PreambleConfig::default());
        assert_eq!(cleaned, "The heart has four chambers");
    }

    #[test]
    fn strips_leading_header_without_phrase() {
        let raw = "OCR extracted content: Water is H2O";
        let cleaned = clean_transcript(raw, &PreambleConfig::default());
        assert_eq!(cleaned, "Water is H2O");
    }

    #[test]
    fn clean_text_is_only_trimmed() {
        let raw = "  Plain notes\nsecond line  \n";
        assert_eq!(
            clean_transcript(raw, &PreambleConfig::default()),
            "Plain notes\nsecond line"
        );
    }

    #[test]
    fn denylist_is_extensible() {
        let config = PreambleConfig {
            drop_phrases: vec!["Voici le texte".into()],
        };
        let raw = "Voici le texte transcrit :\nLa mitose";
        assert_eq!(clean_transcript(raw, &config), "La mitose");
    }

    #[test]
    fn empty_phrases_are_ignored() {
        let config = PreambleConfig {
            drop_phrases: vec!["".into(), "   ".into()],
        };
        assert_eq!(clean_transcript("keep me\nand me", &config), "keep me\nand me");
    }
}
