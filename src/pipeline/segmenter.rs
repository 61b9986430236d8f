//! Transcript segmentation into note units.
//!
//! A transcript mixes bulleted, numbered and prose paragraphs. A unit starts
//! at a marker line (bullet glyph or short numbering) or after a blank line,
//! and soft-wrapped continuation lines are joined with a single space.

use serde::{Deserialize, Serialize};

/// One semantically independent span of transcript text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteUnit {
    /// Position in first-appearance order within the source transcript.
    pub index: usize,
    /// Trimmed, never empty.
    pub text: String,
}

/// A rule deciding whether a line opens a new unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerRule {
    /// Line begins with one of these glyphs.
    Bullet { glyphs: Vec<char> },
    /// Line begins with 1..=`max_digits` ASCII digits immediately followed
    /// by one of `delimiters` (`1.`, `12)`).
    Numbered {
        max_digits: usize,
        delimiters: Vec<char>,
    },
}

impl MarkerRule {
    /// Byte length of the marker prefix if `line` starts with this marker.
    fn prefix_len(&self, line: &str) -> Option<usize> {
        match self {
            Self::Bullet { glyphs } => {
                let first = line.chars().next()?;
                glyphs.contains(&first).then(|| first.len_utf8())
            }
            Self::Numbered {
                max_digits,
                delimiters,
            } => {
                let digits = line.bytes().take_while(u8::is_ascii_digit).count();
                if digits == 0 || digits > *max_digits {
                    return None;
                }
                let delim = line[digits..].chars().next()?;
                delimiters
                    .contains(&delim)
                    .then(|| digits + delim.len_utf8())
            }
        }
    }
}

/// Segmentation settings. Part of the user-facing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub rules: Vec<MarkerRule>,
    /// Characters trimmed from the start of a unit after its marker is removed.
    /// Markers already consume their delimiter, so this is whitespace by default.
    pub strip_chars: Vec<char>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                MarkerRule::Bullet {
                    glyphs: vec!['-', '•'],
                },
                MarkerRule::Numbered {
                    max_digits: 2,
                    delimiters: vec!['.', ')'],
                },
            ],
            strip_chars: vec![' ', '\t'],
        }
    }
}

/// Splits transcripts into [`NoteUnit`]s.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Segment a transcript. Whitespace-only input yields no units.
    pub fn segment(&self, text: &str) -> Vec<NoteUnit> {
        let mut sections: Vec<String> = Vec::new();
        let mut current = String::new();

        for raw_line in text.lines() {
            let line = raw_line.trim();

            if line.is_empty() {
                flush(&mut current, &mut sections);
                continue;
            }

            match self.marker_len(line) {
                Some(len) => {
                    flush(&mut current, &mut sections);
                    let rest = line[len..]
                        .trim_start_matches(|c| self.config.strip_chars.contains(&c));
                    current.push_str(rest);
                }
                None => {
                    if !current.is_empty() {
                        current.push(' ');
                    }
                    current.push_str(line);
                }
            }
        }
        flush(&mut current, &mut sections);

        sections
            .into_iter()
            .enumerate()
            .map(|(index, text)| NoteUnit { index, text })
            .collect()
    }

    fn marker_len(&self, line: &str) -> Option<usize> {
        self.config.rules.iter().find_map(|rule| rule.prefix_len(line))
    }
}

/// Segment with the default bullet and numbering rules.
pub fn segment(text: &str) -> Vec<NoteUnit> {
    Segmenter::default().segment(text)
}

/// Close the open unit, dropping it if nothing but markers was collected.
fn flush(current: &mut String, sections: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sections.push(trimmed.to_string());
    }
    current.clear();
}
