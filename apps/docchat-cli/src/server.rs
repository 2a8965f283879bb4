use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use docchat_core::Error;
use docchat_rag::{Orchestrator, Readiness, Status};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

pub const VALIDATION_MESSAGE: &str = "Please send a JSON body with a non-empty \"question\" string.";
pub const FAILURE_MESSAGE: &str = "Sorry, I couldn't answer that right now. Please try again later.";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReindexResponse {
    pub state: Readiness,
}

type ChatReply = (StatusCode, Json<ChatResponse>);

fn reply(status: StatusCode, answer: impl Into<String>) -> ChatReply {
    (status, Json(ChatResponse { answer: answer.into() }))
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/status", get(status_handler))
        .route("/api/reindex", post(reindex_handler))
        .with_state(orchestrator)
}

async fn chat_handler(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ChatReply {
    let question = match payload {
        Ok(Json(request)) if !request.question.trim().is_empty() => request.question,
        Ok(_) => {
            debug!("rejected blank question");
            return reply(StatusCode::BAD_REQUEST, VALIDATION_MESSAGE);
        }
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "rejected malformed chat request");
            return reply(StatusCode::BAD_REQUEST, VALIDATION_MESSAGE);
        }
    };

    match orchestrator.answer(&question).await {
        Ok(answer) => {
            info!(mode = ?answer.mode, sources = answer.sources.len(), "question answered");
            reply(StatusCode::OK, answer.text)
        }
        Err(Error::RequestValidation(_)) => reply(StatusCode::BAD_REQUEST, VALIDATION_MESSAGE),
        Err(e) => {
            error!(error = %e, kind = e.kind(), "question could not be answered");
            reply(StatusCode::INTERNAL_SERVER_ERROR, FAILURE_MESSAGE)
        }
    }
}

async fn status_handler(State(orchestrator): State<Arc<Orchestrator>>) -> Json<Status> {
    Json(orchestrator.status())
}

async fn reindex_handler(State(orchestrator): State<Arc<Orchestrator>>) -> (StatusCode, Json<ReindexResponse>) {
    if orchestrator.spawn_reinitialize().is_some() {
        info!("reindex started");
        (StatusCode::ACCEPTED, Json(ReindexResponse { state: Readiness::Initializing }))
    } else {
        debug!("reindex refused: build already running");
        (StatusCode::CONFLICT, Json(ReindexResponse { state: orchestrator.readiness() }))
    }
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, orchestrator: Arc<Orchestrator>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "http server listening");
    axum::serve(listener, router(orchestrator)).with_graceful_shutdown(shutdown).await?;
    info!("http server stopped");
    Ok(())
}

pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c; shutdown only by kill");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
