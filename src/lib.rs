#![deny(missing_docs)]

//! Core library for the formrag question-answering server.

/// HTTP routing and REST handlers.
pub mod api;
/// Session-scoped chat service and its capability trait.
pub mod chat;
/// Environment-driven configuration and pipeline settings.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Language identification for incoming questions.
pub mod language;
/// Chat-completion client abstraction and adapters.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Answering metrics helpers.
pub mod metrics;
/// Routing, expansion, retrieval, and answer streaming.
pub mod pipeline;
/// Page-cleaning transforms for ingestion.
pub mod preprocess;
/// Qdrant vector store integration.
pub mod qdrant;
/// Document model and similarity search.
pub mod retrieval;
/// Translation backend and the pre-retrieval router.
pub mod translate;
