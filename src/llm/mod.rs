//! Text-completion capability, streaming and non-streaming.

mod openai;

pub use openai::OpenAiChatClient;

use async_trait::async_trait;
use futures_core::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Completion backend was unreachable.
    #[error("Completion backend unavailable: {0}")]
    BackendUnavailable(String),
    /// Completion backend returned an error response.
    #[error("Completion request failed: {0}")]
    RequestFailed(String),
    /// Completion backend response could not be parsed.
    #[error("Malformed completion response: {0}")]
    InvalidResponse(String),
    /// Stream broke after tokens had started arriving.
    #[error("Completion stream interrupted: {0}")]
    StreamInterrupted(String),
}

/// Sampling parameters forwarded with every completion request.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    /// Model identifier understood by the backend.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Sampling seed for reproducible answers.
    pub seed: u32,
}

/// Lazy token sequence produced by a streaming completion.
///
/// Dropping the stream cancels the underlying HTTP response body, releasing
/// the connection.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send>>;

/// Interface implemented by text-completion backends.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Request a full completion, returning the whole response text.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Request a streaming completion, yielding tokens as they arrive.
    async fn stream(&self, prompt: &str) -> Result<TokenStream, CompletionError>;
}
