//! Pipeline counters and health reporting.
//!
//! [`QuizMetrics`] holds lock-free counters bumped by the replenisher and
//! the orchestrator. [`start_periodic_usage_flush`] emits them as a
//! structured log line on an interval and once more at shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::cache::CacheStats;

const USAGE_FLUSH_INTERVAL_SECS: u64 = 60;

// ============================================================================
// QuizMetrics
// ============================================================================

/// Lock-free counters for the question pipeline.
#[derive(Debug, Default)]
pub struct QuizMetrics {
    /// Records the replenisher put into the cache.
    pub admitted: AtomicU64,
    /// Valid records dropped because the cache was full.
    pub dropped: AtomicU64,
    /// Generated records that failed parsing or validation.
    pub rejected: AtomicU64,
    /// Transport failures, quota exhaustion included.
    pub generation_failures: AtomicU64,
    /// Times the replenisher backed off for quota.
    pub quota_backoffs: AtomicU64,
    /// Consumer takes served from the cache.
    pub cache_hits: AtomicU64,
    /// Consumer takes that timed out or yielded an invalid record.
    pub cache_misses: AtomicU64,
    /// Direct generator calls made on behalf of a consumer.
    pub fallback_generations: AtomicU64,
    /// Requests that ran out of attempts.
    pub exhausted: AtomicU64,
}

/// Plain-value copy of [`QuizMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub admitted: u64,
    pub dropped: u64,
    pub rejected: u64,
    pub generation_failures: u64,
    pub quota_backoffs: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub fallback_generations: u64,
    pub exhausted: u64,
}

impl QuizMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            admitted: load(&self.admitted),
            dropped: load(&self.dropped),
            rejected: load(&self.rejected),
            generation_failures: load(&self.generation_failures),
            quota_backoffs: load(&self.quota_backoffs),
            cache_hits: load(&self.cache_hits),
            cache_misses: load(&self.cache_misses),
            fallback_generations: load(&self.fallback_generations),
            exhausted: load(&self.exhausted),
        }
    }

    /// Emit current counters as a structured log line.
    pub fn emit_usage(&self, reason: &str) {
        let s = self.snapshot();
        info!(
            event = "usage_summary",
            reason = reason,
            admitted = s.admitted,
            dropped = s.dropped,
            rejected = s.rejected,
            generation_failures = s.generation_failures,
            quota_backoffs = s.quota_backoffs,
            cache_hits = s.cache_hits,
            cache_misses = s.cache_misses,
            fallback_generations = s.fallback_generations,
            exhausted = s.exhausted,
        );
    }
}

/// Spawn a task that emits usage every minute until shutdown is signalled.
pub fn start_periodic_usage_flush(
    metrics: Arc<QuizMetrics>,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(USAGE_FLUSH_INTERVAL_SECS));
        interval.tick().await; // skip first immediate tick

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    metrics.emit_usage("periodic");
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        metrics.emit_usage("shutdown");
                        break;
                    }
                }
            }
        }
    })
}

// ============================================================================
// Health report
// ============================================================================

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// `ok`, or `degraded` while the cache is empty.
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub cache: CacheStats,
    pub usage: MetricsSnapshot,
}

impl HealthReport {
    pub fn build(cache: CacheStats, metrics: &QuizMetrics, started: Instant) -> Self {
        Self {
            status: if cache.len == 0 { "degraded" } else { "ok" },
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: started.elapsed().as_secs(),
            cache,
            usage: metrics.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        assert_eq!(QuizMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_incr_updates_snapshot() {
        let m = QuizMetrics::new();
        QuizMetrics::incr(&m.cache_hits);
        QuizMetrics::incr(&m.cache_hits);
        QuizMetrics::incr(&m.fallback_generations);
        let s = m.snapshot();
        assert_eq!(s.cache_hits, 2);
        assert_eq!(s.fallback_generations, 1);
        assert_eq!(s.admitted, 0);
    }

    #[test]
    fn test_health_report_degraded_when_cache_empty() {
        let stats = CacheStats {
            len: 0,
            capacity: 200,
            low_water: 100,
        };
        let report = HealthReport::build(stats, &QuizMetrics::new(), Instant::now());
        assert_eq!(report.status, "degraded");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cache"]["capacity"], 200);
        assert_eq!(json["usage"]["cache_hits"], 0);
    }

    #[test]
    fn test_health_report_ok_with_entries() {
        let stats = CacheStats {
            len: 3,
            capacity: 200,
            low_water: 100,
        };
        let report = HealthReport::build(stats, &QuizMetrics::new(), Instant::now());
        assert_eq!(report.status, "ok");
    }

    #[tokio::test]
    async fn test_usage_flush_stops_on_shutdown() {
        let (tx, rx) = tokio::sync::watch::channel(false);
        let handle = start_periodic_usage_flush(Arc::new(QuizMetrics::new()), rx);
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("flush task should stop")
            .unwrap();
    }
}
