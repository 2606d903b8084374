//! Bounded in-memory question cache.

pub mod question_cache;

pub use question_cache::{CacheStats, Empty, QuestionCache};
