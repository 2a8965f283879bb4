use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use docchat_answer::{AnswerContext, RemoteGenerator, Synthesizer};
use docchat_core::config::Settings;
use docchat_core::data_processor::{fallback_context, Chunker, ChunkingConfig, DocumentLoader};
use docchat_core::traits::Embedder;
use docchat_core::types::Document;
use docchat_core::{Error, Result};
use docchat_embed::get_default_embedder;
use docchat_vector::EmbeddingIndex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::state::{Answer, AnswerMode, AnswerPath, IndexState, Readiness, Snapshot, Status};

/// The part of [`Settings`] the orchestrator needs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub docs_dir: PathBuf,
    pub extensions: Vec<String>,
    pub chunking: ChunkingConfig,
    pub top_k: usize,
    pub embed_batch_size: usize,
}

impl From<&Settings> for OrchestratorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            docs_dir: settings.data.docs_dir.clone(),
            extensions: settings.data.extensions.clone(),
            chunking: settings.chunking.clone(),
            top_k: settings.retrieval.top_k,
            embed_batch_size: settings.retrieval.embed_batch_size,
        }
    }
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    embedder: Arc<dyn Embedder>,
    synthesizer: Synthesizer,
    state: watch::Sender<Snapshot>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, embedder: Arc<dyn Embedder>, synthesizer: Synthesizer) -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        Self { config, embedder, synthesizer, state }
    }

    /// Wire the configured embedding and generation services.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let embedder = get_default_embedder(settings)?;
        let generator = RemoteGenerator::new(
            settings.service.http_config(),
            settings.generation.model.clone(),
            settings.generation.temperature,
            settings.generation.max_tokens,
        )?;
        info!(embedder = embedder.embedder_id(), generator = %settings.generation.model, "orchestrator configured");
        Ok(Self::new(OrchestratorConfig::from(settings), embedder, Synthesizer::new(Arc::new(generator))))
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    pub fn readiness(&self) -> Readiness {
        self.state.borrow().index.readiness()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    pub fn status(&self) -> Status {
        let snapshot = self.state.borrow();
        let passages = match &snapshot.index {
            IndexState::Ready(index) => index.len(),
            _ => 0,
        };
        Status { state: snapshot.index.readiness(), documents: snapshot.documents, passages }
    }

    /// Build the index once. A no-op outside `Uninitialized`; if another build is
    /// running, waits for it to settle instead.
    pub async fn initialize(&self) -> Readiness {
        if self.try_begin(false) {
            self.build().await
        } else {
            self.wait_until_settled().await
        }
    }

    /// Rebuild from `Ready` or `Failed`. Returns `None` while a build is in progress.
    pub async fn reinitialize(&self) -> Option<Readiness> {
        if self.try_begin(true) {
            Some(self.build().await)
        } else {
            None
        }
    }

    /// Like [`initialize`](Self::initialize) on a background task. The state is
    /// already `Initializing` when this returns.
    pub fn spawn_initialize(self: &Arc<Self>) -> JoinHandle<Readiness> {
        let this = Arc::clone(self);
        if self.try_begin(false) {
            tokio::spawn(async move { this.build().await })
        } else {
            tokio::spawn(async move { this.wait_until_settled().await })
        }
    }

    pub fn spawn_reinitialize(self: &Arc<Self>) -> Option<JoinHandle<Readiness>> {
        if !self.try_begin(true) {
            return None;
        }
        let this = Arc::clone(self);
        Some(tokio::spawn(async move { this.build().await }))
    }

    /// Resolves once no build is in progress.
    pub async fn wait_until_settled(&self) -> Readiness {
        let mut rx = self.state.subscribe();
        let settled = rx
            .wait_for(|s| s.index.readiness() != Readiness::Initializing)
            .await
            .map(|snapshot| snapshot.index.readiness());
        settled.unwrap_or_else(|_| self.readiness())
    }

    fn try_begin(&self, restart: bool) -> bool {
        self.state.send_if_modified(|snapshot| {
            let allowed = match snapshot.index {
                IndexState::Uninitialized => true,
                IndexState::Ready(_) | IndexState::Failed(_) => restart,
                IndexState::Initializing => false,
            };
            if allowed {
                snapshot.index = IndexState::Initializing;
            }
            allowed
        })
    }

    async fn load_documents(&self) -> Result<Vec<Document>> {
        let loader = DocumentLoader::with_extensions(self.config.extensions.iter());
        let docs_dir = self.config.docs_dir.clone();
        tokio::task::spawn_blocking(move || loader.load_dir(&docs_dir))
            .await
            .map_err(|e| Error::load(&self.config.docs_dir, std::io::Error::other(e)))?
    }

    async fn build(&self) -> Readiness {
        let started = Instant::now();
        info!(docs_dir = %self.config.docs_dir.display(), "initializing index");

        let documents = match self.load_documents().await {
            Ok(documents) => documents,
            Err(e) => return self.fail(e),
        };
        let fallback: Arc<str> = Arc::from(fallback_context(&documents));
        let document_count = documents.len();
        // Degraded answers can use the new text while embedding is still running.
        self.state.send_modify(|snapshot| {
            snapshot.fallback = fallback;
            snapshot.documents = document_count;
        });

        let chunker = match Chunker::new(&self.config.chunking) {
            Ok(chunker) => chunker,
            Err(e) => return self.fail(e),
        };
        let passages = chunker.chunk_all(&documents);
        debug!(documents = document_count, passages = passages.len(), "documents chunked");

        match EmbeddingIndex::build(passages, self.embedder.clone(), self.config.embed_batch_size).await {
            Ok(index) => {
                info!(
                    documents = document_count,
                    passages = index.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "index ready"
                );
                self.state.send_modify(|snapshot| snapshot.index = IndexState::Ready(Arc::new(index)));
                Readiness::Ready
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&self, e: Error) -> Readiness {
        error!(error = %e, kind = e.kind(), "index initialization failed; serving fallback answers");
        let cause: Arc<str> = Arc::from(e.to_string());
        self.state.send_modify(|snapshot| snapshot.index = IndexState::Failed(cause));
        Readiness::Failed
    }

    /// Answer a question, preferring retrieval and falling back to the full
    /// document text once if retrieval is unavailable or fails.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::RequestValidation("question must not be empty".into()));
        }

        let fallback = match self.snapshot().path() {
            AnswerPath::Retrieval { index, fallback } => {
                match self.answer_from_index(&index, question).await {
                    Ok(answer) => return Ok(answer),
                    Err(e) => {
                        warn!(error = %e, kind = e.kind(), "retrieval answer failed; using fallback context");
                        fallback
                    }
                }
            }
            AnswerPath::Degraded(fallback) => {
                debug!(state = ?self.readiness(), "index unavailable; using fallback context");
                fallback
            }
        };

        let text = self
            .synthesizer
            .synthesize(question, AnswerContext::Fallback(&fallback))
            .await
            .inspect_err(|e| error!(error = %e, kind = e.kind(), "fallback answer failed"))?;
        Ok(Answer { text, mode: AnswerMode::Fallback, sources: Vec::new() })
    }

    async fn answer_from_index(&self, index: &EmbeddingIndex, question: &str) -> Result<Answer> {
        let hits = index.query(question, self.config.top_k).await?;
        debug!(hits = hits.len(), top_score = hits.first().map(|h| h.score), "passages retrieved");
        let text = self.synthesizer.synthesize(question, AnswerContext::Passages(&hits)).await?;
        let sources = hits.into_iter().map(|h| h.passage.id).collect();
        Ok(Answer { text, mode: AnswerMode::Retrieval, sources })
    }
}
