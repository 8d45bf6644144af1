//! Qdrant vector store integration.

mod client;
mod filters;
mod payload;
mod types;

pub use client::QdrantService;
pub use filters::build_topic_filter;
pub use payload::{compute_content_hash, current_timestamp_rfc3339};
pub use types::{PagePayload, PointInsert, QdrantError, ScoredPoint};
