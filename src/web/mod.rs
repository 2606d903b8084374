//! Browser-facing quiz pages.
//!
//! Thin glue over [`crate::orchestrator::Orchestrator`]: handlers obtain
//! questions, keep progress in signed cookies and render HTML.

pub mod routes;
pub mod server;
pub mod session;
pub mod views;

pub use server::{build_router, start_server, AppState};
pub use session::{Graded, MissedLog, MissedQuestion, QuizSession, SessionCodec};
