//! The answering pipeline: routing, expansion, retrieval, grounded streaming.
//!
//! One [`RagPipeline`] instance corresponds to one applied settings set. Every
//! call to [`RagPipeline::answer`] is an independent turn; the only state the
//! pipeline holds is its immutable component wiring.

pub mod expand;
pub mod prompts;
pub mod retrieve;

pub use expand::{DEFAULT_QUERY_COUNT, ExpansionError};
pub use retrieve::RetrievalResult;

use crate::config::PipelineSettings;
use crate::language::{DetectionError, LanguageDetector};
use crate::llm::{CompletionError, LlmClient};
use crate::retrieval::{RetrievalError, Retriever};
use crate::translate::{RouteError, TranslationError, TranslationRouter, Translator};
use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort an answering turn.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The question's language could not be classified.
    #[error("Language detection failed: {0}")]
    Detection(#[from] DetectionError),
    /// The question needed translation and the backend failed.
    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationError),
    /// Query expansion produced no usable queries or failed outright.
    #[error("Query expansion failed: {0}")]
    Expansion(#[from] ExpansionError),
    /// A similarity search failed.
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
    /// The answer completion failed, before or during streaming.
    #[error("Completion failed: {0}")]
    Completion(#[from] CompletionError),
}

impl From<RouteError> for PipelineError {
    fn from(error: RouteError) -> Self {
        match error {
            RouteError::Detection(inner) => Self::Detection(inner),
            RouteError::Translation(inner) => Self::Translation(inner),
        }
    }
}

/// One element of the answer stream.
///
/// `Context` and `Question` each occur exactly once per turn, before the first
/// token; consumers must nevertheless tolerate either order relative to
/// tokens, matching the transport contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerEvent {
    /// One streamed answer token.
    Token(String),
    /// The retrieval provenance for this turn.
    Context(RetrievalResult),
    /// The routed (possibly translated) question the answer is grounded on.
    Question(String),
}

/// Lazy event sequence for one answering turn.
///
/// Dropping the stream cancels the turn, releasing the completion stream and
/// any in-flight retrieval calls with it.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<AnswerEvent, PipelineError>> + Send>>;

/// Composed answering pipeline for one settings set.
pub struct RagPipeline {
    router: TranslationRouter,
    retriever: Arc<dyn Retriever>,
    llm: Arc<dyn LlmClient>,
    settings: PipelineSettings,
}

impl RagPipeline {
    /// Wire a pipeline from its components and the settings that shaped them.
    pub fn new(
        detector: Box<dyn LanguageDetector>,
        translator: Arc<dyn Translator>,
        retriever: Arc<dyn Retriever>,
        llm: Arc<dyn LlmClient>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            router: TranslationRouter::new(detector, translator),
            retriever,
            llm,
            settings,
        }
    }

    /// The settings this pipeline was built from.
    pub fn settings(&self) -> PipelineSettings {
        self.settings
    }

    /// Answer one question, streaming events as they become available.
    ///
    /// Failures before the completion call abort the stream before any token
    /// is emitted. A failure mid-completion terminates the stream with an
    /// `Err` item; tokens already emitted stand.
    pub fn answer(self: &Arc<Self>, question: String) -> AnswerStream {
        let pipeline = Arc::clone(self);
        let events = try_stream! {
            let threshold = pipeline.settings.german_confidence_threshold;
            let routed = pipeline
                .router
                .route(&question, threshold)
                .await
                .map_err(PipelineError::from)?;

            let result = retrieve::retrieve(
                pipeline.retriever.as_ref(),
                pipeline.llm.as_ref(),
                &routed,
                &question,
                DEFAULT_QUERY_COUNT,
                pipeline.settings.include_original,
            )
            .await?;

            tracing::info!(
                queries = result.queries.len(),
                documents = result.documents.len(),
                translated = routed != question,
                "Turn context assembled"
            );

            let context = prompts::format_context(&result.documents);
            let prompt = prompts::answer_prompt(&context, &routed);

            yield AnswerEvent::Context(result);
            yield AnswerEvent::Question(routed);

            let mut tokens = pipeline.llm.stream(&prompt).await?;
            while let Some(token) = tokens.next().await {
                yield AnswerEvent::Token(token?);
            }
        };
        Box::pin(events)
    }
}
