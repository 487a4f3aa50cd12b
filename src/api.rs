//! HTTP surface for the ToS Decoder.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /analyze` – Sanitize, chunk, and analyze a raw document. Returns the full
//!   [`AnalysisReport`]; a run stopped by quota exhaustion still answers `200` with
//!   `"status": "quota_exhausted"` and whatever was collected.
//! - `POST /ask` – Answer one question about a document, optionally continuing an earlier
//!   conversation passed in as `history`.
//! - `GET /metrics` – Observe analysis counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

use crate::analysis::{AnalysisApi, AnalysisError, AnalysisReport};
use crate::session::{ChatTurn, DocumentSession, SessionError};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the analysis API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: AnalysisApi + 'static,
{
    Router::new()
        .route("/analyze", post(analyze_document::<S>))
        .route("/ask", post(ask_question::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /analyze` endpoint.
#[derive(Deserialize)]
struct AnalyzeRequest {
    /// Raw document contents.
    text: String,
}

/// Analyze a document end to end.
async fn analyze_document<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisReport>, AppError>
where
    S: AnalysisApi,
{
    let report = service.analyze(request.text).await?;
    tracing::info!(
        run_id = %report.run_id,
        status = ?report.status,
        chunks = report.chunks.len(),
        risks = report.risks.len(),
        "Analyze request completed"
    );
    Ok(Json(report))
}

/// Request body for the `POST /ask` endpoint.
#[derive(Deserialize)]
struct AskRequest {
    /// Document text the question is about.
    text: String,
    /// Question to answer.
    question: String,
    /// Earlier turns of the conversation, oldest first.
    #[serde(default)]
    history: Vec<ChatTurn>,
}

/// Response body for the `POST /ask` endpoint.
#[derive(Serialize)]
struct AskResponse {
    /// The assistant's reply.
    answer: String,
    /// Conversation including the new question and answer.
    history: Vec<ChatTurn>,
}

/// Answer a question within a one-shot session.
async fn ask_question<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError>
where
    S: AnalysisApi,
{
    let AskRequest {
        text,
        question,
        history,
    } = request;
    let mut session = DocumentSession::with_history(text, history);
    let turn = service.ask(&mut session, &question).await?;
    Ok(Json(AskResponse {
        answer: turn.content,
        history: session.history().to_vec(),
    }))
}

/// Return the analysis counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsResponse>
where
    S: AnalysisApi,
{
    let snapshot = service.metrics_snapshot();
    Json(MetricsResponse {
        documents_analyzed: snapshot.documents_analyzed,
        chunks_dispatched: snapshot.chunks_dispatched,
        quota_exhaustions: snapshot.quota_exhaustions,
        questions_answered: snapshot.questions_answered,
    })
}

/// Response body for `GET /metrics`.
#[derive(Serialize)]
struct MetricsResponse {
    documents_analyzed: u64,
    chunks_dispatched: u64,
    quota_exhaustions: u64,
    questions_answered: u64,
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "analyze",
                method: "POST",
                path: "/analyze",
                description: "Sanitize and chunk a Terms of Service document, summarize each chunk, consolidate the summaries, and extract risks. Returns the analysis report.",
                request_example: Some(json!({
                    "text": "Terms of Service contents"
                })),
            },
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/ask",
                description: "Answer a question about a document. Pass the returned history back to continue the conversation.",
                request_example: Some(json!({
                    "text": "Terms of Service contents",
                    "question": "Can they sell my data?",
                    "history": []
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return analysis counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Analysis(AnalysisError),
    Session(SessionError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Analysis(error @ AnalysisError::InsufficientText { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
            }
            Self::Analysis(error) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
            Self::Session(error) => (StatusCode::UNPROCESSABLE_ENTITY, error.to_string()),
        };
        (status, message).into_response()
    }
}

impl From<AnalysisError> for AppError {
    fn from(inner: AnalysisError) -> Self {
        Self::Analysis(inner)
    }
}

impl From<SessionError> for AppError {
    fn from(inner: SessionError) -> Self {
        Self::Session(inner)
    }
}
