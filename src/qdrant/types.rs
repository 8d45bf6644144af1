//! Shared types used by the Qdrant client and helpers.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Metadata persisted with every indexed page.
#[derive(Debug, Clone, Default)]
pub struct PagePayload {
    /// One-based page number within the source PDF.
    pub page: i64,
    /// Leaflet topic (`Arbeitslosengeld` / `Bürgergeld`), used for filtering.
    pub topic: Option<String>,
    /// Section title resolved from the table of contents, if any.
    pub section_title: Option<String>,
    /// Section number resolved from the table of contents, if any.
    pub section_number: Option<String>,
    /// Optional URI of the source PDF for traceability.
    pub source_uri: Option<String>,
}

/// Prepared point ready for indexing, including text, hash, and vector.
#[derive(Debug, Clone)]
pub struct PointInsert {
    /// Cleaned page text.
    pub text: String,
    /// Deterministic hash of the text used for dedupe.
    pub content_hash: String,
    /// Embedding vector produced for the page.
    pub vector: Vec<f32>,
    /// Page metadata persisted alongside the vector.
    pub payload: PagePayload,
}

/// Scored payload returned by Qdrant queries.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Similarity score computed by Qdrant.
    pub score: f32,
    /// Optional payload associated with the vector.
    pub payload: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct ListCollectionsResponse {
    pub(crate) result: ListCollectionsResult,
}

#[derive(Deserialize)]
pub(crate) struct ListCollectionsResult {
    pub(crate) collections: Vec<CollectionDescription>,
}

#[derive(Deserialize)]
pub(crate) struct CollectionDescription {
    pub(crate) name: String,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
        #[serde(default)]
        _count: Option<usize>,
    },
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
