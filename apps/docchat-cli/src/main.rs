use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docchat_cli::{server, telemetry};
use docchat_core::config::{expand_path, Config, Settings};
use docchat_core::data_processor::{Chunker, DataProcessor, DocumentLoader};
use docchat_embed::get_default_embedder;
use docchat_rag::{Orchestrator, Readiness};
use docchat_vector::EmbeddingIndex;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "docchat", version, about = "Answer questions about a local document collection")]
struct Cli {
    /// Directory holding config.toml and config.<env>.toml.
    #[arg(long, global = true, env = "DOCCHAT_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Overrides `data.docs_dir`.
    #[arg(long, global = true)]
    docs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Build the index once and report what was indexed.
    Index,
    /// Answer a single question and exit.
    Ask { question: String },
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let config = match &cli.config_dir {
        Some(dir) => {
            let env_name = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
            Config::load_from(dir, &env_name)?
        }
        None => Config::load()?,
    };
    let mut settings = config.settings()?;
    if let Some(dir) = &cli.docs_dir {
        settings.data.docs_dir = expand_path(dir.to_string_lossy());
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    telemetry::init_tracing(&settings.log)?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(&settings, port).await,
        Command::Index => index(&settings).await,
        Command::Ask { question } => ask(&settings, &question).await,
    }
}

async fn serve(settings: &Settings, port: Option<u16>) -> Result<()> {
    let orchestrator = Arc::new(Orchestrator::from_settings(settings)?);
    let addr = match port {
        Some(port) => format!("{}:{}", settings.server.host, port),
        None => settings.server.bind_addr(),
    };
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;

    // The listener is up first; requests during the build get fallback answers.
    let _build = orchestrator.spawn_initialize();
    server::serve(listener, orchestrator, server::shutdown_signal()).await?;
    Ok(())
}

async fn index(settings: &Settings) -> Result<()> {
    let processor = DataProcessor::new(
        DocumentLoader::with_extensions(&settings.data.extensions),
        Chunker::new(&settings.chunking)?,
    );
    let corpus = processor.process_directory(&settings.data.docs_dir)?;
    let embedder = get_default_embedder(settings)?;

    let bar = ProgressBar::new(corpus.passages.len() as u64);
    bar.set_style(ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} passages")?);
    let index = EmbeddingIndex::build_with_progress(
        corpus.passages,
        embedder,
        settings.retrieval.embed_batch_size,
        |done, _| bar.set_position(done as u64),
    )
    .await?;
    bar.finish_and_clear();

    println!("Indexed {} documents into {} passages", corpus.documents.len(), index.len());
    if let Some(dim) = index.dim() {
        println!("Embedder: {} ({dim} dimensions)", index.embedder_id());
    }
    Ok(())
}

async fn ask(settings: &Settings, question: &str) -> Result<()> {
    let orchestrator = Orchestrator::from_settings(settings)?;
    match orchestrator.initialize().await {
        Readiness::Ready => info!("index ready"),
        state => warn!(?state, "index unavailable; answering from full document text"),
    }
    let answer = orchestrator.answer(question).await?;
    println!("{}", answer.text);
    Ok(())
}
