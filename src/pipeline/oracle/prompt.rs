//! Prompt construction for single-unit and batch-label requests.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::types::{GenerationParams, OracleRequest, ResponseShape};
use crate::pipeline::batch::types::QaSeed;

/// System prompt sent with every flashcard request.
pub const STUDY_ASSISTANT_SYSTEM: &str = "You are an expert study assistant.";

const INSTRUCTION_PREFIX: &str = "You are an AI assistant trained to create educational flashcards. \
Read the note below and extract one factual question and its answer. \
Your output must strictly follow this format:\n\nQ: <question>\nA: <answer>\n\n";

const FEW_SHOT_EXAMPLES: &str = "Note: Water boils at 100 degrees Celsius.
Q: At what temperature does water boil?
A: 100 degrees Celsius.

Note: The mitochondria is the powerhouse of the cell.
Q: What is the powerhouse of the cell?
A: The mitochondria.

";

const SEED_BATCH_HEADER: &str = "You are a helpful student taking notes from a teacher.\n\n\
Here are some Q&As. Write one realistic class note for each, labeled N1, N2, etc.:\n\n";

const SEED_BATCH_FOOTER: &str = "\nReturn one sentence note per Q&A as N1, N2, etc.";

/// How a note unit is presented to the oracle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// Explicit format instructions followed by the note.
    #[default]
    Instruction,
    /// Worked examples, then the note and an open `Q:` for the model to continue.
    FewShot,
    /// The note text alone, for models fine-tuned on note → flashcard.
    Bare,
}

impl PromptStyle {
    pub fn build_prompt(&self, note: &str) -> String {
        match self {
            Self::Instruction => format!("{INSTRUCTION_PREFIX}Note: {note}"),
            Self::FewShot => format!("{FEW_SHOT_EXAMPLES}Note: {note}\nQ:"),
            Self::Bare => note.to_string(),
        }
    }

    /// Undo prompt artifacts before parsing.
    ///
    /// Few-shot completions either echo the whole prompt (keep what follows
    /// the last `Note:`) or continue right after the open `Q:` (restore it).
    pub fn prepare_response<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        match self {
            Self::FewShot => {
                let tail = match raw.rfind("Note:") {
                    Some(pos) => raw[pos + "Note:".len()..].trim(),
                    None => raw.trim(),
                };
                if has_question_marker(tail) {
                    Cow::Borrowed(tail)
                } else {
                    Cow::Owned(format!("Q: {tail}"))
                }
            }
            Self::Instruction | Self::Bare => Cow::Borrowed(raw),
        }
    }
}

fn has_question_marker(text: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim_start();
        ["Q:", "Q\u{FF1A}", "q:", "Question:"]
            .iter()
            .any(|marker| line.starts_with(marker))
    })
}

/// Request asking for one flashcard about `note`.
pub fn build_unit_request(note: &str, style: PromptStyle, params: &GenerationParams) -> OracleRequest {
    OracleRequest {
        prompt: style.build_prompt(note),
        system: Some(STUDY_ASSISTANT_SYSTEM.to_string()),
        params: params.clone(),
        shape: ResponseShape::SingleUnit,
    }
}

/// Request asking for one labelled study note per seed (`N1:` ..).
pub fn build_seed_request(seeds: &[QaSeed], params: &GenerationParams) -> OracleRequest {
    let mut prompt = String::from(SEED_BATCH_HEADER);
    for (i, seed) in seeds.iter().enumerate() {
        let n = i + 1;
        prompt.push_str(&format!("Q{n}: {}\nA{n}: {}\n", seed.question, seed.answer));
    }
    prompt.push_str(SEED_BATCH_FOOTER);

    OracleRequest {
        prompt,
        system: None,
        params: params.clone(),
        shape: ResponseShape::BatchLabel { count: seeds.len() },
    }
}
