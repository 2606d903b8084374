//! Admission gate for question records.
//!
//! Runs before a record enters the cache and again before one is handed to a
//! user. Pure: no I/O, no side effects.

use serde::{Deserialize, Serialize};

use super::record::{Candidate, QuestionRecord, OPTION_COUNT};

/// How strictly records are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Required fields non-empty and exactly four options (default).
    #[default]
    Loose,
    /// Loose checks plus: every option non-empty and the correct answer
    /// present among the options after trimming.
    Strict,
}

/// Validator bound to a policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    policy: ValidationPolicy,
}

impl Validator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    /// Returns `true` when the candidate may be cached or shown.
    pub fn is_valid(&self, candidate: &Candidate) -> bool {
        match candidate {
            Candidate::Record(record) => self.check(record).is_ok(),
            Candidate::Rejected(_) => false,
        }
    }

    /// Same as [`Validator::is_valid`] for a bare record.
    pub fn is_valid_record(&self, record: &QuestionRecord) -> bool {
        self.check(record).is_ok()
    }

    /// Check a record, returning the first failed rule.
    pub fn check(&self, record: &QuestionRecord) -> Result<(), &'static str> {
        if record.prompt_text.is_empty() {
            return Err("missing question text");
        }
        if record.code_block.is_empty() {
            return Err("missing code block");
        }
        if record.correct_answer.is_empty() {
            return Err("missing correct answer");
        }
        if record.answer_options.len() != OPTION_COUNT {
            return Err("answer options must contain exactly four entries");
        }
        if self.policy == ValidationPolicy::Strict {
            if record.answer_options.iter().any(|o| o.trim().is_empty()) {
                return Err("empty answer option");
            }
            let correct = record.correct_answer.trim();
            if !record.answer_options.iter().any(|o| o.trim() == correct) {
                return Err("correct answer is not one of the options");
            }
        }
        Ok(())
    }
}

/// Loose-policy shorthand.
pub fn is_valid(candidate: &Candidate) -> bool {
    Validator::default().is_valid(candidate)
}
