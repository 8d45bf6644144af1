//! HTTP surface for the chat service.
//!
//! A compact Axum router with a handful of endpoints:
//!
//! - `POST /chat` – Answer a question. The response body is an NDJSON stream of
//!   events (`{"token":…}`, `{"context":…}`, `{"question":…}`); a turn that
//!   fails mid-stream ends with a terminal `{"error":…}` line.
//! - `GET /settings` / `PUT /settings` – Inspect or replace the pipeline
//!   settings; a change rebuilds the pipeline atomically.
//! - `POST /index` – Preprocess, embed, and upsert one PDF page.
//! - `GET /metrics` – Answering counters.
//! - `GET /health` – Vector store connectivity check.

use crate::chat::{BuildError, ChatApi, IngestError, IngestPage};
use crate::config::PipelineSettings;
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

/// Build the HTTP router over a chat service.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ChatApi + 'static,
{
    Router::new()
        .route("/chat", post(answer_question::<S>))
        .route("/settings", get(get_settings::<S>).put(put_settings::<S>))
        .route("/index", post(index_page::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/health", get(get_health::<S>))
        .with_state(service)
}

/// Request body for `POST /chat`.
#[derive(Deserialize)]
struct ChatRequest {
    question: String,
}

/// Answer a question, streaming NDJSON events.
async fn answer_question<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<ChatRequest>,
) -> Response
where
    S: ChatApi,
{
    let mut events = service.answer(request.question).await;

    let lines = async_stream::stream! {
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => {
                    let line = serde_json::to_string(&event)
                        .unwrap_or_else(|error| json!({ "error": error.to_string() }).to_string());
                    yield Ok::<_, Infallible>(Bytes::from(line + "\n"));
                }
                Err(error) => {
                    tracing::warn!(error = %error, "Chat turn failed");
                    let line = json!({ "error": error.to_string() }).to_string();
                    yield Ok(Bytes::from(line + "\n"));
                    break;
                }
            }
        }
    };

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response()
}

/// Return the currently applied settings.
async fn get_settings<S>(State(service): State<Arc<S>>) -> Json<PipelineSettings>
where
    S: ChatApi,
{
    Json(service.settings().await)
}

/// Validate and apply new settings.
async fn put_settings<S>(
    State(service): State<Arc<S>>,
    Json(settings): Json<PipelineSettings>,
) -> Result<Json<PipelineSettings>, AppError>
where
    S: ChatApi,
{
    let applied = service.update_settings(settings).await?;
    tracing::info!(
        model = applied.model.as_str(),
        collection = applied.collection.as_str(),
        "Settings applied"
    );
    Ok(Json(applied))
}

/// Index one page into the active collection.
async fn index_page<S>(
    State(service): State<Arc<S>>,
    Json(page): Json<IngestPage>,
) -> Result<Json<crate::chat::IngestOutcome>, AppError>
where
    S: ChatApi,
{
    let outcome = service.index_page(page).await?;
    Ok(Json(outcome))
}

/// Return the answering counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: ChatApi,
{
    Json(service.metrics_snapshot())
}

/// Report vector store connectivity.
async fn get_health<S>(State(service): State<Arc<S>>) -> Response
where
    S: ChatApi,
{
    match service.health().await {
        Ok(collections) => {
            Json(json!({ "status": "ok", "collections": collections })).into_response()
        }
        Err(error) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "error": error.to_string() })),
        )
            .into_response(),
    }
}

enum AppError {
    Build(BuildError),
    Ingest(IngestError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Build(BuildError::Settings(error)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
            }
            Self::Build(error) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
            Self::Ingest(IngestError::EmptyPage) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                IngestError::EmptyPage.to_string(),
            ),
            Self::Ingest(error) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<BuildError> for AppError {
    fn from(inner: BuildError) -> Self {
        Self::Build(inner)
    }
}

impl From<IngestError> for AppError {
    fn from(inner: IngestError) -> Self {
        Self::Ingest(inner)
    }
}
