//! Text-completion providers.
//!
//! The question generator only needs "send this instruction text, get raw
//! text back". Providers translate HTTP-level failures into
//! [`GenerationError`] so quota exhaustion can be told apart from other
//! transport errors.

pub mod gemini;
#[cfg(test)]
pub(crate) mod scripted;

use async_trait::async_trait;

use crate::error::{GenerationError, QUOTA_MARKER};

pub use gemini::{GeminiAuth, GeminiProvider};

/// A backend that turns one instruction payload into one text completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

/// Map a non-success HTTP status and its message to a [`GenerationError`].
///
/// 429 is always quota exhaustion; other statuses are promoted when the body
/// carries the quota marker.
pub fn parse_provider_error(status: u16, message: &str) -> GenerationError {
    if status == 429 {
        return GenerationError::QuotaExhausted {
            detail: format!("{status} {QUOTA_MARKER}: {message}"),
        };
    }
    GenerationError::transport(format!("{status}: {message}"))
}
