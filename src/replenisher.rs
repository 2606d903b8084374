//! Background producer that keeps the question cache above its low-water mark.
//!
//! Each cycle either idles (cache at or above the mark) or makes exactly one
//! generation attempt. The pause before the next cycle depends on how the
//! cycle ended, see [`backoff_for`]. Shutdown is observed between cycles
//! and while sleeping; an in-flight generation is only cut short by
//! [`join_with_grace`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::QuestionCache;
use crate::config::ReplenishConfig;
use crate::error::GenerationError;
use crate::health::QuizMetrics;
use crate::quiz::Generator;

/// How a single replenisher cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Cache at or above the low-water mark; nothing generated.
    Idle,
    /// A valid record was added to the cache.
    Admitted,
    /// A valid record was generated but the cache was full.
    Dropped,
    /// The model answered but the record was unusable.
    Rejected,
    /// The provider call failed. `quota` marks upstream quota exhaustion.
    Failed { quota: bool },
}

/// Pause to take after a cycle.
pub fn backoff_for(outcome: CycleOutcome, config: &ReplenishConfig) -> Duration {
    match outcome {
        CycleOutcome::Idle => config.idle_poll(),
        CycleOutcome::Failed { quota: true } => config.quota_backoff(),
        CycleOutcome::Admitted
        | CycleOutcome::Dropped
        | CycleOutcome::Rejected
        | CycleOutcome::Failed { quota: false } => config.normal_backoff(),
    }
}

/// Keeps a [`QuestionCache`] topped up from a [`Generator`].
pub struct Replenisher {
    cache: Arc<QuestionCache>,
    generator: Generator,
    low_water: usize,
    config: ReplenishConfig,
    metrics: Arc<QuizMetrics>,
}

impl Replenisher {
    pub fn new(
        cache: Arc<QuestionCache>,
        generator: Generator,
        low_water: usize,
        config: ReplenishConfig,
        metrics: Arc<QuizMetrics>,
    ) -> Self {
        Self {
            cache,
            generator,
            low_water,
            config,
            metrics,
        }
    }

    /// Run one cycle without sleeping.
    pub async fn run_cycle(&self) -> CycleOutcome {
        if self.cache.len() >= self.low_water {
            return CycleOutcome::Idle;
        }

        match self.generator.generate().await {
            // `generate` only returns records its validator accepted.
            Ok(record) => {
                if self.cache.try_put(record) {
                    QuizMetrics::incr(&self.metrics.admitted);
                    debug!(cached = self.cache.len(), "Question admitted to cache");
                    CycleOutcome::Admitted
                } else {
                    QuizMetrics::incr(&self.metrics.dropped);
                    debug!("Cache full, dropping generated question");
                    CycleOutcome::Dropped
                }
            }
            Err(err @ (GenerationError::Parse { .. } | GenerationError::Invalid(_))) => {
                QuizMetrics::incr(&self.metrics.rejected);
                debug!(error = %err, "Discarding unusable generated question");
                CycleOutcome::Rejected
            }
            Err(err) => {
                QuizMetrics::incr(&self.metrics.generation_failures);
                let quota = err.is_quota();
                if quota {
                    QuizMetrics::incr(&self.metrics.quota_backoffs);
                }
                warn!(error = %err, quota, "Question generation failed");
                CycleOutcome::Failed { quota }
            }
        }
    }

    /// Run cycles until `shutdown_rx` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            provider = self.generator.provider_name(),
            low_water = self.low_water,
            capacity = self.cache.capacity(),
            "Replenisher started"
        );
        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            let outcome = self.run_cycle().await;
            let pause = backoff_for(outcome, &self.config);
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
        info!("Replenisher shutting down");
    }

    /// Spawn [`Replenisher::run`] on the runtime. The returned handle may be
    /// awaited after signalling shutdown, or dropped to detach the task.
    pub fn start(self, shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown_rx))
    }
}

/// Await a replenisher that has been told to stop. A cycle stuck in a
/// provider call past `grace` is aborted. Returns whether it exited cleanly.
pub async fn join_with_grace(mut handle: JoinHandle<()>, grace: Duration) -> bool {
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "Replenisher task failed");
            false
        }
        Err(_) => {
            warn!(grace_secs = grace.as_secs(), "Replenisher still busy, aborting");
            handle.abort();
            false
        }
    }
}
