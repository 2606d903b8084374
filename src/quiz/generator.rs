//! One-shot question generation.
//!
//! A [`Generator`] sends the instruction payload to its provider exactly once
//! per call and turns the completion into a validated [`QuestionRecord`].
//! Retrying is left to the replenisher and the orchestrator.

use std::sync::Arc;

use tracing::debug;

use crate::error::GenerationError;
use crate::providers::CompletionProvider;

use super::parse::parse_completion;
use super::record::{QuestionRecord, RejectedRecord};
use super::validator::Validator;

/// Produces question records from a completion provider.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn CompletionProvider>,
    prompt: Arc<str>,
    validator: Validator,
}

impl Generator {
    pub fn new(provider: Arc<dyn CompletionProvider>, prompt: impl Into<Arc<str>>) -> Self {
        Self {
            provider,
            prompt: prompt.into(),
            validator: Validator::default(),
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn validator(&self) -> Validator {
        self.validator
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Call the provider once and parse its completion.
    pub async fn generate(&self) -> Result<QuestionRecord, GenerationError> {
        let text = self.provider.complete(&self.prompt).await?;
        let record = parse_completion(&text)?;
        if let Err(reason) = self.validator.check(&record) {
            debug!(reason, "Generated record failed validation");
            return Err(GenerationError::Invalid(
                RejectedRecord::new(reason).with_raw(text),
            ));
        }
        Ok(record)
    }
}
