//! Consumer-side question retrieval.
//!
//! [`Orchestrator::obtain`] prefers the cache and falls back to one direct
//! generation when the cache cannot serve in time. Request handlers call
//! [`Orchestrator::obtain_with_retry`], which bounds how many times that is
//! repeated before giving up with [`QuizError::RetryBudgetExhausted`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::QuestionCache;
use crate::config::RetrievalConfig;
use crate::error::{QuizError, Result};
use crate::health::QuizMetrics;
use crate::quiz::{Candidate, Generator, QuestionRecord};

/// Hands out questions to request handlers.
#[derive(Clone)]
pub struct Orchestrator {
    cache: Arc<QuestionCache>,
    generator: Generator,
    metrics: Arc<QuizMetrics>,
    take_timeout: Duration,
    retry_delay: Duration,
    max_attempts: u32,
}

impl Orchestrator {
    pub fn new(
        cache: Arc<QuestionCache>,
        generator: Generator,
        config: &RetrievalConfig,
        metrics: Arc<QuizMetrics>,
    ) -> Self {
        Self {
            cache,
            generator,
            metrics,
            take_timeout: config.take_timeout(),
            retry_delay: config.retry_delay(),
            max_attempts: config.max_attempts.max(1),
        }
    }

    pub fn cache(&self) -> &Arc<QuestionCache> {
        &self.cache
    }

    /// One retrieval: a cache take, then at most one direct generation.
    ///
    /// The blocking wait runs on the blocking pool so request handlers keep
    /// the async workers free. The result may still be unusable when the
    /// fallback generation fails; callers must check it.
    pub async fn obtain(&self) -> Candidate {
        let cache = Arc::clone(&self.cache);
        let timeout = self.take_timeout;
        // The blocking wait is not cancelled with this future: a record taken
        // after the caller went away is lost.
        let taken = match tokio::task::spawn_blocking(move || cache.take(timeout)).await {
            Ok(taken) => taken.ok(),
            Err(e) => {
                warn!(error = %e, "Cache wait task failed");
                None
            }
        };

        match taken {
            Some(record) if self.generator.validator().is_valid_record(&record) => {
                QuizMetrics::incr(&self.metrics.cache_hits);
                return Candidate::Record(record);
            }
            Some(_) => debug!("Cached question failed validation, generating directly"),
            None => debug!(
                timeout_secs = timeout.as_secs_f64(),
                "Question cache empty, generating directly"
            ),
        }
        QuizMetrics::incr(&self.metrics.cache_misses);

        QuizMetrics::incr(&self.metrics.fallback_generations);
        match self.generator.generate().await {
            Ok(record) => Candidate::Record(record),
            Err(err) => {
                debug!(error = %err, "Direct generation failed");
                Candidate::Rejected(err.into_rejected())
            }
        }
    }

    /// Repeat [`Orchestrator::obtain`] until it yields a valid record, up to
    /// the configured number of attempts with a pause between attempts.
    pub async fn obtain_with_retry(&self) -> Result<QuestionRecord> {
        for attempt in 1..=self.max_attempts {
            match self.obtain().await {
                // `obtain` validates both the cached and the generated record.
                Candidate::Record(record) => {
                    if attempt > 1 {
                        debug!(attempt, "Obtained question after retrying");
                    }
                    return Ok(record);
                }
                Candidate::Rejected(rejected) => {
                    debug!(attempt, reason = %rejected.reason, "Obtained rejected question")
                }
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        QuizMetrics::incr(&self.metrics.exhausted);
        info!(
            attempts = self.max_attempts,
            "Giving up on question retrieval"
        );
        Err(QuizError::RetryBudgetExhausted {
            attempts: self.max_attempts,
        })
    }
}
