//! Bounded FIFO of validated questions shared by the replenisher and
//! request handlers.
//!
//! Insertion never blocks: a full cache refuses the record. Removal blocks
//! the calling thread up to a timeout, so async callers run it on the
//! blocking pool (see [`crate::orchestrator`]). Every record is delivered to
//! at most one caller.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::warn;

use crate::quiz::QuestionRecord;

/// No record became available before the timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("question cache empty")]
pub struct Empty;

/// Fixed-capacity question queue.
pub struct QuestionCache {
    queue: Mutex<VecDeque<QuestionRecord>>,
    available: Condvar,
    capacity: usize,
}

impl QuestionCache {
    /// Create an empty cache. `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Append `record` unless the cache is full. Never evicts.
    pub fn try_put(&self, record: QuestionRecord) -> bool {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back(record);
        drop(queue);
        self.available.notify_one();
        true
    }

    /// Remove the oldest record, waiting up to `timeout` for one to arrive.
    pub fn take(&self, timeout: Duration) -> Result<QuestionRecord, Empty> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.lock();
        loop {
            if let Some(record) = queue.pop_front() {
                return Ok(record);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(Empty);
            }
            queue = match self.available.wait_timeout(queue, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Remove the oldest record without waiting.
    #[cfg(test)]
    pub fn try_take(&self) -> Option<QuestionRecord> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, VecDeque<QuestionRecord>> {
        self.queue.lock().unwrap_or_else(|poisoned| {
            warn!("Question cache lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

/// Point-in-time cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub len: usize,
    pub capacity: usize,
    pub low_water: usize,
}

impl CacheStats {
    pub fn snapshot(cache: &QuestionCache, low_water: usize) -> Self {
        Self {
            len: cache.len(),
            capacity: cache.capacity(),
            low_water,
        }
    }

    /// Below the low-water mark, so the replenisher should be generating.
    pub fn is_low(&self) -> bool {
        self.len < self.low_water
    }
}
