//! Question records and their rejected counterpart.

use serde::{Deserialize, Serialize};

/// Number of answer options every usable question carries.
pub const OPTION_COUNT: usize = 4;

/// A single generated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// Question statement shown to the user.
    pub prompt_text: String,
    /// Source snippet the question is about.
    pub code_block: String,
    /// Displayed choices, in display order.
    pub answer_options: Vec<String>,
    /// Must match one of `answer_options` after trimming.
    pub correct_answer: String,
    /// Rationale shown after answering. May be empty.
    #[serde(default)]
    pub explanation: String,
}

impl QuestionRecord {
    /// Whether `selection` is the correct answer, ignoring surrounding whitespace.
    pub fn is_correct(&self, selection: &str) -> bool {
        !selection.trim().is_empty() && selection.trim() == self.correct_answer.trim()
    }
}

/// A candidate that failed parsing or validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub reason: String,
    /// Unparsed model output, when available.
    pub raw: Option<String>,
}

impl RejectedRecord {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }
}

/// Anything that may be handed to the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Record(QuestionRecord),
    Rejected(RejectedRecord),
}

impl From<QuestionRecord> for Candidate {
    fn from(record: QuestionRecord) -> Self {
        Candidate::Record(record)
    }
}

impl From<RejectedRecord> for Candidate {
    fn from(rejected: RejectedRecord) -> Self {
        Candidate::Rejected(rejected)
    }
}
