//! In-memory provider replaying canned completions. Test-only.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GenerationError;

use super::CompletionProvider;

/// A well-formed fenced completion.
pub(crate) const VALID_COMPLETION: &str = "```json\n{\"Pregunta\":\"Q\",\"Codigo\":\"c\",\"Respuestas\":[\"1\",\"2\",\"3\",\"4\"],\"Respuesta correcta\":\"2\",\"Explicacion\":\"e\"}\n```";

/// Replays `script` in order, then repeats `fallback` forever.
pub(crate) struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    fallback: Result<String, GenerationError>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn always(result: Result<String, GenerationError>) -> Self {
        Self::new(Vec::new(), result)
    }

    pub(crate) fn valid() -> Self {
        Self::always(Ok(VALID_COMPLETION.to_string()))
    }

    pub(crate) fn new(
        script: Vec<Result<String, GenerationError>>,
        fallback: Result<String, GenerationError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
