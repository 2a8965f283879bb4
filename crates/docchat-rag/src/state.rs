use std::sync::Arc;

use docchat_vector::EmbeddingIndex;
use serde::{Deserialize, Serialize};

/// Externally visible lifecycle of the index.
///
/// `Uninitialized → Initializing → Ready | Failed`; leaving `Ready` or
/// `Failed` requires an explicit re-initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

#[derive(Debug, Clone)]
pub enum IndexState {
    Uninitialized,
    Initializing,
    Ready(Arc<EmbeddingIndex>),
    /// Cause of the last failed build, for logs only.
    Failed(Arc<str>),
}

impl IndexState {
    pub fn readiness(&self) -> Readiness {
        match self {
            Self::Uninitialized => Readiness::Uninitialized,
            Self::Initializing => Readiness::Initializing,
            Self::Ready(_) => Readiness::Ready,
            Self::Failed(_) => Readiness::Failed,
        }
    }
}

/// Everything a request needs, published atomically by the initializer.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub index: IndexState,
    /// Full document text; kept even when the index build fails.
    pub fallback: Arc<str>,
    pub documents: usize,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self { index: IndexState::Uninitialized, fallback: Arc::from(""), documents: 0 }
    }
}

/// Which answering path a request takes.
#[derive(Debug, Clone)]
pub enum AnswerPath {
    /// Retrieve from the index; the fallback text backs it up if that fails.
    Retrieval { index: Arc<EmbeddingIndex>, fallback: Arc<str> },
    Degraded(Arc<str>),
}

impl Snapshot {
    pub fn path(&self) -> AnswerPath {
        match &self.index {
            IndexState::Ready(index) => AnswerPath::Retrieval { index: index.clone(), fallback: self.fallback.clone() },
            _ => AnswerPath::Degraded(self.fallback.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    pub state: Readiness,
    pub documents: usize,
    pub passages: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    Retrieval,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub mode: AnswerMode,
    /// Ids of the passages the answer was grounded in; empty in fallback mode.
    pub sources: Vec<String>,
}
