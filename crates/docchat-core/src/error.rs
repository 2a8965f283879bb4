use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load documents from {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Invalid request: {0}")]
    RequestValidation(String),
}

impl Error {
    pub fn load(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Load { path: path.into(), source }
    }

    /// Short stable label used in logs and status reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "invalid_config",
            Self::Load { .. } => "load",
            Self::EmbeddingService(_) => "embedding_service",
            Self::Generation(_) => "generation",
            Self::RequestValidation(_) => "request_validation",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
