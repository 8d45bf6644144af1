//! Fixed prompt templates and context formatting.

use crate::retrieval::Document;

/// Separator placed between document contents in the default context format.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Build the instruction prompt asking the model for alternative phrasings.
///
/// The generated queries must be German regardless of the question's original
/// language; the question reaching this point has already been routed through
/// translation.
pub fn expansion_prompt(question: &str, count: usize) -> String {
    format!(
        "You are an AI language model assistant. Your task is to generate {count} \
         different versions of the given user question to retrieve relevant \
         documents from a vector database. All versions must be written in german. \
         By generating multiple perspectives on the user question, your goal is to \
         help the user overcome some of the limitations of distance-based \
         similarity search. Provide these alternative questions separated by \
         newlines. Original question: {question}"
    )
}

/// Build the grounded-answer prompt from formatted context and the question.
pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question based only on the following context:\n\n\
         {context}\n\n\
         Question: {question}\n"
    )
}

/// Concatenate document contents with blank-line separators, preserving order.
pub fn format_context(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|document| document.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Alternative context format wrapping each document in `<source>` tags.
///
/// Useful when the answer model should be able to distinguish passage
/// boundaries explicitly.
pub fn format_context_with_source_tags(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|document| format!("<source>\n{}\n</source>", document.content))
        .collect::<Vec<_>>()
        .join("\n")
}
