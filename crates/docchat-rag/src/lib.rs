//! Question answering over a document directory.
//!
//! [`Orchestrator`] owns the index lifecycle and routes each question through
//! retrieval when the index is ready, or through the full document text otherwise.

mod orchestrator;
mod state;

pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use state::{Answer, AnswerMode, AnswerPath, IndexState, Readiness, Snapshot, Status};
