//! Error types for codequiz.
//!
//! [`GenerationError`] covers the recoverable failures of a single generation
//! attempt; the replenisher and the orchestrator absorb all of them.
//! [`QuizError`] is the crate-level error. Of its variants only
//! [`QuizError::RetryBudgetExhausted`] is produced by the question pipeline.

use thiserror::Error;

use crate::quiz::RejectedRecord;

/// Marker the Gemini API puts in quota / rate-limit errors.
pub const QUOTA_MARKER: &str = "RESOURCE_EXHAUSTED";

/// Failure of one `Generator::generate` call.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// Upstream unreachable or returned an error.
    #[error("transport failure: {detail}")]
    Transport { detail: String },

    /// Upstream quota or rate limit exhausted.
    #[error("quota exhausted: {detail}")]
    QuotaExhausted { detail: String },

    /// Model output was not a decodable JSON object.
    #[error("parse failure: {detail}")]
    Parse { detail: String, raw: String },

    /// Output decoded but the record is structurally incomplete.
    #[error("invalid record: {}", .0.reason)]
    Invalid(RejectedRecord),
}

impl GenerationError {
    /// Classify a transport-level message, promoting it to
    /// [`GenerationError::QuotaExhausted`] when it carries the quota marker.
    pub fn transport(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if detail.contains(QUOTA_MARKER) {
            Self::QuotaExhausted { detail }
        } else {
            Self::Transport { detail }
        }
    }

    /// Returns `true` for upstream quota exhaustion.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExhausted { .. })
    }

    /// Convert into a [`RejectedRecord`] for diagnostics.
    pub fn into_rejected(self) -> RejectedRecord {
        match self {
            Self::Invalid(rejected) => rejected,
            Self::Parse { detail, raw } => RejectedRecord::new(detail).with_raw(raw),
            other => RejectedRecord::new(other.to_string()),
        }
    }
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum QuizError {
    /// Invalid or missing configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// I/O failure (binding sockets, reading config files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Provider construction or call failure outside the generation path.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Session cookie could not be encoded.
    #[error("Session error: {0}")]
    Session(String),

    /// Every consumer-facing attempt produced an unusable question.
    #[error("Retry budget exhausted after {attempts} attempts")]
    RetryBudgetExhausted { attempts: u32 },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QuizError>;
