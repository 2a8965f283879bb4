use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use docchat_answer::Synthesizer;
use docchat_core::data_processor::ChunkingConfig;
use docchat_core::traits::{Embedder, Generator};
use docchat_core::types::{ChatMessage, Role};
use docchat_core::{Error, Result};
use docchat_rag::{AnswerMode, IndexState, Orchestrator, OrchestratorConfig, Readiness};
use futures::future::{self, BoxFuture, FutureExt};
use tempfile::TempDir;
use tokio::sync::watch;

/// Three axes: "where someone lives", the name Mushtaq, and a small bias so no
/// vector is all zeros.
fn keyword_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0, 0.0, 0.1];
    for token in text.split(|c: char| !c.is_alphanumeric()).map(str::to_lowercase) {
        match token.as_str() {
            "live" | "lives" | "where" => v[0] += 2.0,
            "mushtaq" => v[1] += 1.0,
            _ => {}
        }
    }
    v
}

struct KeywordEmbedder {
    calls: AtomicUsize,
    /// Calls after this many succeed fail with an embedding error.
    fail_after: Option<usize>,
    gate: Option<watch::Receiver<bool>>,
}

impl KeywordEmbedder {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0), fail_after: None, gate: None }
    }

    fn failing_after(n: usize) -> Self {
        Self { fail_after: Some(n), ..Self::new() }
    }

    fn gated(gate: watch::Receiver<bool>) -> Self {
        Self { gate: Some(gate), ..Self::new() }
    }
}

impl Embedder for KeywordEmbedder {
    fn embedder_id(&self) -> &str {
        "keyword"
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        async move {
            if let Some(gate) = &self.gate {
                let mut gate = gate.clone();
                let _ = gate.wait_for(|open| *open).await.map(|_| ());
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_after.is_some_and(|n| call >= n) {
                return Err(Error::EmbeddingService("embedding service unavailable".into()));
            }
            Ok(texts.iter().map(|t| keyword_vector(t)).collect())
        }
        .boxed()
    }
}

/// Replies with the system turn followed by the question, so tests can see
/// exactly which context reached the generator.
struct EchoGenerator {
    calls: AtomicUsize,
    fail: bool,
}

impl EchoGenerator {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0), fail: false }
    }

    fn failing() -> Self {
        Self { calls: AtomicUsize::new(0), fail: true }
    }
}

impl Generator for EchoGenerator {
    fn generator_id(&self) -> &str {
        "echo"
    }

    fn complete<'a>(&'a self, messages: &'a [ChatMessage]) -> BoxFuture<'a, Result<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return future::ready(Err(Error::Generation("model overloaded".into()))).boxed();
        }
        let system = messages.iter().find(|m| m.role == Role::System).map(|m| m.content.clone()).unwrap_or_default();
        let user = messages.iter().find(|m| m.role == Role::User).map(|m| m.content.clone()).unwrap_or_default();
        future::ready(Ok(format!("{system}\nQ: {user}"))).boxed()
    }
}

fn write_docs(dir: &Path) {
    fs::write(dir.join("a.txt"), "Mushtaq is a software engineer.").unwrap();
    fs::write(dir.join("b.txt"), "He lives in City X.").unwrap();
}

fn config(dir: &Path, top_k: usize) -> OrchestratorConfig {
    OrchestratorConfig {
        docs_dir: dir.to_path_buf(),
        extensions: vec!["txt".into()],
        chunking: ChunkingConfig { chunk_size: 50, chunk_overlap: 10 },
        top_k,
        embed_batch_size: 8,
    }
}

fn orchestrator(dir: &Path, embedder: KeywordEmbedder, generator: EchoGenerator) -> (Orchestrator, Arc<EchoGenerator>) {
    let generator = Arc::new(generator);
    let orch = Orchestrator::new(config(dir, 2), Arc::new(embedder), Synthesizer::new(generator.clone()));
    (orch, generator)
}

#[tokio::test]
async fn answers_from_retrieved_passages_when_ready() {
    let dir = TempDir::new().unwrap();
    write_docs(dir.path());
    let (orch, _) = orchestrator(dir.path(), KeywordEmbedder::new(), EchoGenerator::new());

    assert_eq!(orch.readiness(), Readiness::Uninitialized);
    assert_eq!(orch.initialize().await, Readiness::Ready);
    let status = orch.status();
    assert_eq!((status.documents, status.passages), (2, 2));

    let answer = orch.answer("Where does Mushtaq live?").await.expect("answer");
    assert_eq!(answer.mode, AnswerMode::Retrieval);
    assert_eq!(answer.sources, vec!["b.txt:0".to_string(), "a.txt:0".to_string()]);
    assert!(answer.text.contains("[b.txt#0]\nHe lives in City X."));
    assert!(answer.text.contains("Mushtaq is a software engineer."));
    assert!(answer.text.ends_with("Q: Where does Mushtaq live?"));
}

#[tokio::test]
async fn top_k_limits_context() {
    let dir = TempDir::new().unwrap();
    write_docs(dir.path());
    let generator = Arc::new(EchoGenerator::new());
    let orch = Orchestrator::new(config(dir.path(), 1), Arc::new(KeywordEmbedder::new()), Synthesizer::new(generator));
    orch.initialize().await;

    let answer = orch.answer("Where does Mushtaq live?").await.unwrap();
    assert_eq!(answer.sources, vec!["b.txt:0".to_string()]);
    assert!(!answer.text.contains("Mushtaq is a software engineer."));
}

#[tokio::test]
async fn failed_build_serves_full_documents() {
    let dir = TempDir::new().unwrap();
    write_docs(dir.path());
    let (orch, generator) = orchestrator(dir.path(), KeywordEmbedder::failing_after(0), EchoGenerator::new());

    assert_eq!(orch.initialize().await, Readiness::Failed);
    assert!(matches!(orch.snapshot().index, IndexState::Failed(_)));
    assert_eq!(&*orch.snapshot().fallback, "Mushtaq is a software engineer.\n\nHe lives in City X.");

    for _ in 0..3 {
        let answer = orch.answer("Where does Mushtaq live?").await.expect("fallback answer");
        assert_eq!(answer.mode, AnswerMode::Fallback);
        assert!(answer.sources.is_empty());
        assert!(answer.text.contains("Context:\nMushtaq is a software engineer.\n\nHe lives in City X."));
    }
    assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retrieval_error_mid_request_falls_back_once() {
    let dir = TempDir::new().unwrap();
    write_docs(dir.path());
    // One batch for the build, then every query embedding fails.
    let (orch, generator) = orchestrator(dir.path(), KeywordEmbedder::failing_after(1), EchoGenerator::new());

    assert_eq!(orch.initialize().await, Readiness::Ready);
    let answer = orch.answer("Where does Mushtaq live?").await.expect("fallback answer");
    assert_eq!(answer.mode, AnswerMode::Fallback);
    assert!(answer.text.contains("He lives in City X."));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    // A request-time failure does not change the lifecycle state.
    assert_eq!(orch.readiness(), Readiness::Ready);
}

#[tokio::test]
async fn both_paths_failing_is_an_error() {
    let dir = TempDir::new().unwrap();
    write_docs(dir.path());
    let (orch, generator) = orchestrator(dir.path(), KeywordEmbedder::new(), EchoGenerator::failing());

    orch.initialize().await;
    let err = orch.answer("Where does Mushtaq live?").await.unwrap_err();
    assert!(matches!(err, Error::Generation(_)));
    // Primary attempt plus exactly one fallback attempt.
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn blank_question_is_rejected_without_calling_services() {
    let dir = TempDir::new().unwrap();
    write_docs(dir.path());
    let (orch, generator) = orchestrator(dir.path(), KeywordEmbedder::new(), EchoGenerator::new());
    orch.initialize().await;

    for question in ["", "   \n\t"] {
        let err = orch.answer(question).await.unwrap_err();
        assert!(matches!(err, Error::RequestValidation(_)));
    }
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_directory_is_ready_with_no_passages() {
    let dir = TempDir::new().unwrap();
    let (orch, _) = orchestrator(dir.path(), KeywordEmbedder::new(), EchoGenerator::new());

    assert_eq!(orch.initialize().await, Readiness::Ready);
    assert_eq!(orch.status().passages, 0);
    assert_eq!(&*orch.snapshot().fallback, "");

    let answer = orch.answer("Anything?").await.expect("answer");
    assert_eq!(answer.mode, AnswerMode::Retrieval);
    assert!(answer.sources.is_empty());
    assert!(answer.text.contains("No reference material"));
}

#[tokio::test]
async fn missing_directory_fails_but_still_answers() {
    let dir = TempDir::new().unwrap();
    let (orch, _) = orchestrator(&dir.path().join("nope"), KeywordEmbedder::new(), EchoGenerator::new());

    assert_eq!(orch.initialize().await, Readiness::Failed);
    let answer = orch.answer("Anything?").await.expect("answer");
    assert_eq!(answer.mode, AnswerMode::Fallback);
    assert!(answer.text.contains("No reference material"));
}

#[tokio::test]
async fn requests_during_initialization_use_fallback() {
    let dir = TempDir::new().unwrap();
    write_docs(dir.path());
    let (open, gate) = watch::channel(false);
    let generator = Arc::new(EchoGenerator::new());
    let orch = Arc::new(Orchestrator::new(
        config(dir.path(), 2),
        Arc::new(KeywordEmbedder::gated(gate)),
        Synthesizer::new(generator.clone()),
    ));

    let mut snapshots = orch.subscribe();
    let handle = orch.spawn_initialize();
    snapshots.wait_for(|s| s.documents == 2).await.unwrap();
    assert_eq!(orch.readiness(), Readiness::Initializing);

    let answer = orch.answer("Where does Mushtaq live?").await.expect("answer while initializing");
    assert_eq!(answer.mode, AnswerMode::Fallback);
    assert!(answer.text.contains("He lives in City X."));

    // No rebuild can start while one is running.
    assert!(orch.reinitialize().await.is_none());
    open.send(true).unwrap();
    assert_eq!(handle.await.unwrap(), Readiness::Ready);
    assert_eq!(orch.wait_until_settled().await, Readiness::Ready);
    assert_eq!(orch.answer("Where does Mushtaq live?").await.unwrap().mode, AnswerMode::Retrieval);
}

#[tokio::test]
async fn initialize_runs_once_and_reinitialize_rebuilds() {
    let dir = TempDir::new().unwrap();
    write_docs(dir.path());
    let (orch, _) = orchestrator(dir.path(), KeywordEmbedder::new(), EchoGenerator::new());

    assert_eq!(orch.initialize().await, Readiness::Ready);
    fs::write(dir.path().join("c.txt"), "Mushtaq works in City Y.").unwrap();
    // Already settled: no rebuild.
    assert_eq!(orch.initialize().await, Readiness::Ready);
    assert_eq!(orch.status().documents, 2);

    assert_eq!(orch.reinitialize().await, Some(Readiness::Ready));
    let status = orch.status();
    assert_eq!((status.documents, status.passages), (3, 3));
    assert!(orch.snapshot().fallback.contains("City Y"));
}

#[tokio::test]
async fn failed_reload_keeps_previous_fallback() {
    let dir = TempDir::new().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    write_docs(&docs);
    let (orch, _) = orchestrator(&docs, KeywordEmbedder::new(), EchoGenerator::new());
    orch.initialize().await;

    fs::remove_dir_all(&docs).unwrap();
    assert_eq!(orch.reinitialize().await, Some(Readiness::Failed));
    assert!(orch.snapshot().fallback.contains("He lives in City X."));
    let answer = orch.answer("Where does Mushtaq live?").await.unwrap();
    assert_eq!(answer.mode, AnswerMode::Fallback);
}
