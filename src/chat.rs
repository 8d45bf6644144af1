//! Session-scoped chat service owning the rebuildable answering pipeline.
//!
//! The service holds exactly one pipeline at a time. Applying new settings
//! builds a complete replacement first and swaps it in behind a write lock, so
//! a turn either sees the old wiring or the new one, never a mixture. The
//! ingestion path shares the session's embedding client and Qdrant handle.

use crate::config::{PipelineSettings, SettingsError, get_config};
use crate::embedding::{EmbeddingClient, EmbeddingClientError, embedding_client_for};
use crate::language::WhatlangDetector;
use crate::llm::{CompletionParams, OpenAiChatClient};
use crate::metrics::{ChatMetrics, MetricsSnapshot};
use crate::pipeline::{AnswerEvent, AnswerStream, RagPipeline};
use crate::preprocess::{TocEntry, TransformPipeline};
use crate::qdrant::{
    PagePayload, PointInsert, QdrantError, QdrantService, build_topic_filter, compute_content_hash,
};
use crate::retrieval::{DEFAULT_RETRIEVAL_LIMIT, Document, QdrantRetriever};
use crate::translate::HttpTranslator;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised while building or rebuilding the pipeline wiring.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Submitted settings failed validation.
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),
    /// The Qdrant client could not be constructed.
    #[error("Qdrant client setup failed: {0}")]
    Qdrant(#[from] QdrantError),
}

/// Errors raised while ingesting a page.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Page text was empty after preprocessing.
    #[error("page text is empty after preprocessing")]
    EmptyPage,
    /// Embedding the page failed.
    #[error("Failed to embed page: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Upserting the page into Qdrant failed.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
}

/// One raw PDF page submitted for indexing.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestPage {
    /// Raw extracted page text, before cleanup.
    pub text: String,
    /// One-based page number within the source PDF.
    pub page: i64,
    /// Leaflet topic the page belongs to, used for filtered retrieval.
    #[serde(default)]
    pub topic: Option<String>,
    /// Optional URI of the source PDF.
    #[serde(default)]
    pub source_uri: Option<String>,
    /// Table of contents of the source PDF, for section annotation.
    #[serde(default)]
    pub toc: Vec<TocEntry>,
}

/// Result of indexing one page.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// Ids of the points written to the collection.
    pub point_ids: Vec<String>,
    /// Content hash of the cleaned page text.
    pub content_hash: String,
}

/// Capability boundary the HTTP surface is generic over.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Answer one question, streaming events.
    async fn answer(&self, question: String) -> AnswerStream;

    /// Validate and apply new settings, rebuilding the pipeline atomically.
    async fn update_settings(
        &self,
        settings: PipelineSettings,
    ) -> Result<PipelineSettings, BuildError>;

    /// The currently applied settings.
    async fn settings(&self) -> PipelineSettings;

    /// Preprocess, embed, and upsert one page into the active collection.
    async fn index_page(&self, page: IngestPage) -> Result<IngestOutcome, IngestError>;

    /// Current answering counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;

    /// Check the vector store connection, returning the collection names.
    async fn health(&self) -> Result<Vec<String>, QdrantError>;
}

/// Everything one settings set wires together.
struct SessionComponents {
    pipeline: Arc<RagPipeline>,
    embedding: Arc<dyn EmbeddingClient>,
    qdrant: Arc<QdrantService>,
}

fn build_components(settings: PipelineSettings) -> Result<SessionComponents, BuildError> {
    settings.validate()?;
    let config = get_config();

    let qdrant = Arc::new(QdrantService::new()?);
    let embedding = embedding_client_for(settings.collection);
    let retriever = QdrantRetriever::new(
        Arc::clone(&embedding),
        Arc::clone(&qdrant),
        settings.collection.as_str().to_string(),
        build_topic_filter(settings.filter),
        config.retrieval_limit.unwrap_or(DEFAULT_RETRIEVAL_LIMIT),
    );
    let llm = OpenAiChatClient::new(
        config.llm_base_url.clone(),
        config.llm_api_key.clone(),
        CompletionParams {
            model: settings.model.as_str().to_string(),
            temperature: settings.temperature,
            seed: settings.seed,
        },
    );
    let translator = HttpTranslator::new(config.translator_url.clone());

    let pipeline = Arc::new(RagPipeline::new(
        Box::new(WhatlangDetector::new()),
        Arc::new(translator),
        Arc::new(retriever),
        Arc::new(llm),
        settings,
    ));

    tracing::info!(
        model = settings.model.as_str(),
        collection = settings.collection.as_str(),
        filter = ?settings.filter,
        "Pipeline built"
    );

    Ok(SessionComponents {
        pipeline,
        embedding,
        qdrant,
    })
}

/// Chat service backing the HTTP surface.
pub struct ChatService {
    components: RwLock<Arc<SessionComponents>>,
    metrics: Arc<ChatMetrics>,
}

impl ChatService {
    /// Build the service with default settings.
    pub fn new() -> Result<Self, BuildError> {
        let components = build_components(PipelineSettings::default())?;
        Ok(Self {
            components: RwLock::new(Arc::new(components)),
            metrics: Arc::new(ChatMetrics::new()),
        })
    }

    async fn current(&self) -> Arc<SessionComponents> {
        Arc::clone(&*self.components.read().await)
    }
}

#[async_trait]
impl ChatApi for ChatService {
    async fn answer(&self, question: String) -> AnswerStream {
        let components = self.current().await;
        self.metrics.record_turn();

        let metrics = Arc::clone(&self.metrics);
        let events = components.pipeline.answer(question).inspect(move |item| {
            if let Ok(AnswerEvent::Context(result)) = item {
                metrics.record_retrieval(result.queries.len() as u64, result.documents.len() as u64);
            }
        });
        Box::pin(events)
    }

    async fn update_settings(
        &self,
        settings: PipelineSettings,
    ) -> Result<PipelineSettings, BuildError> {
        // Build the replacement outside the lock; a failed rebuild leaves the
        // running pipeline untouched.
        let components = build_components(settings)?;
        let applied = components.pipeline.settings();
        *self.components.write().await = Arc::new(components);
        Ok(applied)
    }

    async fn settings(&self) -> PipelineSettings {
        self.current().await.pipeline.settings()
    }

    async fn index_page(&self, page: IngestPage) -> Result<IngestOutcome, IngestError> {
        let components = self.current().await;

        let transforms = TransformPipeline::standard(page.toc.clone());
        let mut metadata = serde_json::Map::new();
        metadata.insert("page".into(), json!(page.page));
        let cleaned = transforms.apply(Document {
            content: page.text.clone(),
            metadata,
        });

        if cleaned.content.trim().is_empty() {
            return Err(IngestError::EmptyPage);
        }

        let section_title = cleaned
            .metadata
            .get("section_title")
            .and_then(|value| value.as_str())
            .map(str::to_string);
        let section_number = cleaned
            .metadata
            .get("section_number")
            .and_then(|value| value.as_str())
            .map(str::to_string);

        let mut vectors = components
            .embedding
            .generate_embeddings(vec![cleaned.content.clone()])
            .await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| EmbeddingClientError::GenerationFailed("no vector returned".into()))?;

        let collection = components.pipeline.settings().collection;
        components
            .qdrant
            .create_collection_if_not_exists(collection.as_str(), collection.dimension() as u64)
            .await?;

        let content_hash = compute_content_hash(&cleaned.content);
        let point = PointInsert {
            text: cleaned.content,
            content_hash: content_hash.clone(),
            vector,
            payload: PagePayload {
                page: page.page,
                topic: page.topic,
                section_title,
                section_number,
                source_uri: page.source_uri,
            },
        };

        let point_ids = components
            .qdrant
            .index_points(collection.as_str(), vec![point])
            .await?;

        tracing::info!(
            collection = collection.as_str(),
            page = page.page,
            points = point_ids.len(),
            "Page indexed"
        );

        Ok(IngestOutcome {
            point_ids,
            content_hash,
        })
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn health(&self) -> Result<Vec<String>, QdrantError> {
        self.current().await.qdrant.list_collections().await
    }
}
