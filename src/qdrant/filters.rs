//! Search filter construction for the document subset setting.

use crate::config::DocumentFilter;
use serde_json::{Value, json};

/// Build the Qdrant filter clause for a document subset, if any.
///
/// The filter is passed through to Qdrant as an opaque payload predicate; the
/// retrieval pipeline never interprets it.
pub fn build_topic_filter(filter: DocumentFilter) -> Option<Value> {
    filter.topic().map(|topic| {
        json!({
            "must": [
                {
                    "key": "topic",
                    "match": { "value": topic }
                }
            ]
        })
    })
}
