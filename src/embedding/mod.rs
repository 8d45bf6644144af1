//! Embedding client abstraction and HTTP adapters.
//!
//! Each Qdrant collection was built with one specific embedding model, so the
//! client used at query time is selected by collection name, never configured
//! independently. Both adapters issue plain HTTP requests; there is no SDK
//! dependency.

use crate::config::{CollectionName, EmbeddingProvider, get_config};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Build the embedding client matching a collection's backend.
pub fn embedding_client_for(collection: CollectionName) -> Arc<dyn EmbeddingClient> {
    let config = get_config();
    match collection.provider() {
        EmbeddingProvider::OpenAI => {
            let base_url = config
                .openai_embedding_url
                .clone()
                .unwrap_or_else(|| config.llm_base_url.clone());
            Arc::new(OpenAiEmbeddingClient::new(
                base_url,
                config.llm_api_key.clone(),
                collection.embedding_model().to_string(),
            ))
        }
        EmbeddingProvider::Ollama => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            Arc::new(OllamaEmbeddingClient::new(
                base_url,
                collection.embedding_model().to_string(),
            ))
        }
    }
}

/// Embedding client for an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct OpenAiEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiEmbeddingClient {
    /// Construct a client against the given endpoint and model.
    pub fn new(base_url: String, api_key: Option<String>, model: String) -> Self {
        let http = Client::builder()
            .user_agent("formrag/embedding")
            .build()
            .expect("Failed to construct reqwest::Client for embeddings");
        Self {
            http,
            base_url,
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        tracing::debug!(model = %self.model, texts = texts.len(), "Generating embeddings");

        let mut request = self
            .http
            .post(self.endpoint())
            .json(&json!({ "model": self.model, "input": texts }));
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|error| {
            EmbeddingClientError::GenerationFailed(format!(
                "failed to reach embeddings endpoint at {}: {error}",
                self.base_url
            ))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "embeddings endpoint returned {status}: {body}"
            )));
        }

        let body: OpenAiEmbeddingResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::GenerationFailed(format!(
                "failed to decode embeddings response: {error}"
            ))
        })?;

        Ok(body.data.into_iter().map(|item| item.embedding).collect())
    }
}

/// Embedding client for a local Ollama runtime.
pub struct OllamaEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddingClient {
    /// Construct a client against the given Ollama base URL and model.
    pub fn new(base_url: String, model: String) -> Self {
        let http = Client::builder()
            .user_agent("formrag/embedding")
            .build()
            .expect("Failed to construct reqwest::Client for embeddings");
        Self {
            http,
            base_url,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embeddings", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        // Ollama embeds one prompt per request.
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            let response = self
                .http
                .post(self.endpoint())
                .json(&json!({ "model": self.model, "prompt": text }))
                .send()
                .await
                .map_err(|error| {
                    EmbeddingClientError::GenerationFailed(format!(
                        "failed to reach Ollama at {}: {error}",
                        self.base_url
                    ))
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(EmbeddingClientError::GenerationFailed(format!(
                    "Ollama returned {status}: {body}"
                )));
            }

            let body: OllamaEmbeddingResponse = response.json().await.map_err(|error| {
                EmbeddingClientError::GenerationFailed(format!(
                    "failed to decode Ollama response: {error}"
                ))
            })?;
            embeddings.push(body.embedding);
        }

        Ok(embeddings)
    }
}
