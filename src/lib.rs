//! codequiz: a code-reading quiz served from a self-replenishing cache of
//! LLM-generated questions.
//!
//! The pipeline, producer side first:
//!
//! - [`replenisher::Replenisher`] generates questions in the background
//!   while the cache is below its low-water mark.
//! - [`quiz::Generator`] makes one provider call and parses the completion.
//! - [`quiz::Validator`] gates what enters and leaves the cache.
//! - [`cache::QuestionCache`] is the bounded FIFO between the two sides.
//! - [`orchestrator::Orchestrator`] serves request handlers, falling back to
//!   direct generation when the cache is starved.

pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod orchestrator;
pub mod providers;
pub mod quiz;
pub mod replenisher;
pub mod web;

pub use cache::QuestionCache;
pub use config::Config;
pub use error::{GenerationError, QuizError, Result};
pub use orchestrator::Orchestrator;
pub use quiz::{Candidate, Generator, QuestionRecord, RejectedRecord, Validator};
pub use replenisher::Replenisher;
