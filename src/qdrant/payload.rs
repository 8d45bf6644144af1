//! Payload construction helpers for indexed pages.

use crate::qdrant::types::PagePayload;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Compute the deterministic content hash used for page and document dedupe.
pub fn compute_content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Current timestamp rendered as RFC3339, falling back to a plain debug format.
pub fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| format!("{:?}", OffsetDateTime::now_utc()))
}

/// Generate a fresh point identifier.
pub(crate) fn generate_point_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Assemble the Qdrant payload map for one indexed page.
pub(crate) fn build_payload(
    text: &str,
    content_hash: &str,
    timestamp: &str,
    meta: &PagePayload,
) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("text".into(), Value::String(text.to_string()));
    payload.insert("page".into(), json!(meta.page));
    payload.insert("content_hash".into(), Value::String(content_hash.into()));
    payload.insert("timestamp".into(), Value::String(timestamp.into()));
    if let Some(topic) = &meta.topic {
        payload.insert("topic".into(), Value::String(topic.clone()));
    }
    if let Some(title) = &meta.section_title {
        payload.insert("section_title".into(), Value::String(title.clone()));
    }
    if let Some(number) = &meta.section_number {
        payload.insert("section_number".into(), Value::String(number.clone()));
    }
    if let Some(source) = &meta.source_uri {
        payload.insert("source_uri".into(), Value::String(source.clone()));
    }
    payload
}
