//! Multi-query retrieval with content deduplication.

use crate::llm::LlmClient;
use crate::pipeline::PipelineError;
use crate::pipeline::expand;
use crate::qdrant::compute_content_hash;
use crate::retrieval::{Document, Retriever};
use futures_util::future::try_join_all;
use serde::Serialize;
use std::collections::HashSet;

/// Deduplicated retrieval outcome, with the queries retained for provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    /// Unique documents, first occurrence in query-submission order.
    pub documents: Vec<Document>,
    /// Every query issued, expansion order first, original question last.
    pub queries: Vec<String>,
}

/// Expand the routed question and search once per resulting query.
///
/// All searches run concurrently; the parallelism is naturally bounded by the
/// query-set size (typically four). Deduplication order follows query
/// submission order, not completion order, so results are deterministic.
/// A query — or all queries — returning nothing is not an error: the empty
/// context still flows into the prompt, and "answer only if you know" is the
/// answer model's job, not retrieval's.
pub async fn retrieve(
    retriever: &dyn Retriever,
    llm: &dyn LlmClient,
    routed_question: &str,
    original_question: &str,
    count: usize,
    include_original: bool,
) -> Result<RetrievalResult, PipelineError> {
    let mut queries = expand::expand(llm, routed_question, count).await?;
    if include_original {
        // Appended verbatim even when it duplicates a generated query; the
        // document union below handles overlap.
        queries.push(original_question.to_string());
    }

    let searches = queries.iter().map(|query| retriever.search(query));
    let batches = try_join_all(searches).await?;

    let documents = unique_union(batches);
    tracing::debug!(
        queries = queries.len(),
        documents = documents.len(),
        "Multi-query retrieval complete"
    );

    Ok(RetrievalResult { documents, queries })
}

/// Union document batches, keeping the first occurrence of each content text.
///
/// Identity is the content hash alone: two pages with identical text but
/// different metadata count as the same result, and the metadata of the
/// earlier occurrence wins.
pub(crate) fn unique_union(batches: Vec<Vec<Document>>) -> Vec<Document> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for document in batches.into_iter().flatten() {
        let hash = compute_content_hash(&document.content);
        if seen.insert(hash) {
            unique.push(document);
        }
    }
    unique
}
