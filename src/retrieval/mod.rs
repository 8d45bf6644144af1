//! Document model and the similarity-search capability used at query time.

use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::qdrant::{QdrantError, QdrantService, ScoredPoint};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// A retrieved passage: page text plus whatever metadata was indexed with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Cleaned page text.
    pub content: String,
    /// Indexed metadata (page number, topic, section title, ...).
    pub metadata: Map<String, Value>,
}

impl Document {
    /// Build a document from plain text with empty metadata.
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Map::new(),
        }
    }
}

/// Errors emitted while executing a similarity search.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Embedding provider failed to return a vector for the query text.
    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant search request returned an error response.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Embedding provider returned no vectors.
    #[error("Embedding provider returned no vector for the query")]
    EmptyEmbedding,
}

/// Similarity-search capability: one query string in, ranked documents out.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return the ranked candidate documents for `query`.
    async fn search(&self, query: &str) -> Result<Vec<Document>, RetrievalError>;
}

/// Default per-query result count, matching the small per-leaflet corpus.
pub const DEFAULT_RETRIEVAL_LIMIT: usize = 4;

/// Retriever backed by a Qdrant collection and its matching embedding client.
pub struct QdrantRetriever {
    embedding: Arc<dyn EmbeddingClient>,
    qdrant: Arc<QdrantService>,
    collection: String,
    filter: Option<Value>,
    limit: usize,
}

impl QdrantRetriever {
    /// Build a retriever over the given collection.
    ///
    /// `filter` is an opaque Qdrant filter clause; `limit` caps the ranked
    /// results per query.
    pub fn new(
        embedding: Arc<dyn EmbeddingClient>,
        qdrant: Arc<QdrantService>,
        collection: String,
        filter: Option<Value>,
        limit: usize,
    ) -> Self {
        Self {
            embedding,
            qdrant,
            collection,
            filter,
            limit,
        }
    }
}

#[async_trait]
impl Retriever for QdrantRetriever {
    async fn search(&self, query: &str) -> Result<Vec<Document>, RetrievalError> {
        let mut vectors = self
            .embedding
            .generate_embeddings(vec![query.to_string()])
            .await?;
        let vector = vectors.pop().ok_or(RetrievalError::EmptyEmbedding)?;

        let hits = self
            .qdrant
            .search_points(&self.collection, vector, self.filter.clone(), self.limit)
            .await?;

        tracing::debug!(
            collection = %self.collection,
            query_len = query.len(),
            hits = hits.len(),
            "Similarity search complete"
        );

        Ok(hits.into_iter().filter_map(document_from_point).collect())
    }
}

/// Map a scored Qdrant point into a document, skipping points without text.
fn document_from_point(point: ScoredPoint) -> Option<Document> {
    let mut payload = point.payload?;
    let content = match payload.remove("text") {
        Some(Value::String(text)) if !text.trim().is_empty() => text,
        _ => return None,
    };
    payload.insert("score".into(), Value::from(point.score));
    Some(Document {
        content,
        metadata: payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(id: &str, text: Option<&str>, page: i64) -> ScoredPoint {
        let mut payload = Map::new();
        if let Some(text) = text {
            payload.insert("text".into(), Value::String(text.into()));
        }
        payload.insert("page".into(), json!(page));
        ScoredPoint {
            id: id.into(),
            score: 0.9,
            payload: Some(payload),
        }
    }

    #[test]
    fn document_keeps_metadata_and_score() {
        let document =
            document_from_point(point("p1", Some("Bürgergeld sichert den Lebensunterhalt."), 3))
                .expect("document");
        assert_eq!(document.content, "Bürgergeld sichert den Lebensunterhalt.");
        assert_eq!(document.metadata["page"], json!(3));
        assert!(document.metadata.contains_key("score"));
    }

    #[test]
    fn points_without_text_are_skipped() {
        assert!(document_from_point(point("p1", None, 3)).is_none());
        assert!(document_from_point(point("p1", Some("   "), 3)).is_none());
    }
}
