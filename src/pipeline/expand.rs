//! Multi-query expansion via the completion backend.

use crate::llm::{CompletionError, LlmClient};
use crate::pipeline::prompts;
use thiserror::Error;

/// Number of alternative phrasings requested by default.
pub const DEFAULT_QUERY_COUNT: usize = 3;

/// Errors raised while expanding a question into alternative queries.
#[derive(Debug, Error)]
pub enum ExpansionError {
    /// The completion backend failed outright.
    #[error("Completion failed during expansion: {0}")]
    Completion(#[from] CompletionError),
    /// The model responded, but no non-empty query line could be parsed.
    #[error("Model response contained no usable query lines")]
    NoQueries,
}

/// Ask the model for `count` alternative phrasings of `question`.
///
/// The raw response is split on newlines; every trimmed non-empty line becomes
/// one query, in response order. No semantic validation happens here — a model
/// that answers with garbage produces garbage queries, which is accepted.
pub async fn expand(
    llm: &dyn LlmClient,
    question: &str,
    count: usize,
) -> Result<Vec<String>, ExpansionError> {
    let prompt = prompts::expansion_prompt(question, count);
    let response = llm.complete(&prompt).await?;
    let queries = parse_query_lines(&response);
    if queries.is_empty() {
        return Err(ExpansionError::NoQueries);
    }
    tracing::debug!(requested = count, parsed = queries.len(), "Expanded question");
    Ok(queries)
}

/// Split a raw model response into trimmed, non-empty query lines.
pub(crate) fn parse_query_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
