//! Process configuration and per-session pipeline settings.
//!
//! Two layers exist here. [`Config`] is loaded once from environment variables
//! and describes where the external capabilities live (Qdrant, translator,
//! chat-completions endpoint, embedding runtimes). [`PipelineSettings`] is the
//! per-session knob set mirrored from the chat front-end; any change to it
//! rebuilds the whole answering pipeline in one swap.

use serde::{Deserialize, Serialize};
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the formrag server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores the page embeddings.
    pub qdrant_url: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Base URL of the translation backend (LibreTranslate-compatible).
    pub translator_url: String,
    /// Base URL of the OpenAI-compatible chat-completions endpoint.
    pub llm_base_url: String,
    /// Optional bearer token for the chat-completions endpoint.
    pub llm_api_key: Option<String>,
    /// Optional override for the embeddings endpoint; defaults to `llm_base_url`.
    pub openai_embedding_url: Option<String>,
    /// Optional base URL of a local Ollama runtime serving sentence embeddings.
    pub ollama_url: Option<String>,
    /// Optional override for the per-query similarity search result count.
    pub retrieval_limit: Option<usize>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            translator_url: load_env("TRANSLATOR_URL")?,
            llm_base_url: load_env("LLM_BASE_URL")?,
            llm_api_key: load_env_optional("LLM_API_KEY"),
            openai_embedding_url: load_env_optional("OPENAI_EMBEDDING_URL"),
            ollama_url: load_env_optional("OLLAMA_URL"),
            retrieval_limit: load_env_optional("RETRIEVAL_LIMIT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("RETRIEVAL_LIMIT".into()))
                })
                .transpose()?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        translator_url = %config.translator_url,
        llm_base_url = %config.llm_base_url,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

/// Chat models recognized by the settings surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatModel {
    /// `gpt-3.5-turbo-0125`, the default.
    #[serde(rename = "gpt-3.5-turbo-0125")]
    Gpt35Turbo0125,
    /// `gpt-3.5-turbo-1106`.
    #[serde(rename = "gpt-3.5-turbo-1106")]
    Gpt35Turbo1106,
    /// `gpt-4-turbo-2024-04-09`.
    #[serde(rename = "gpt-4-turbo-2024-04-09")]
    Gpt4Turbo20240409,
}

impl ChatModel {
    /// Model identifier as sent to the completions endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gpt35Turbo0125 => "gpt-3.5-turbo-0125",
            Self::Gpt35Turbo1106 => "gpt-3.5-turbo-1106",
            Self::Gpt4Turbo20240409 => "gpt-4-turbo-2024-04-09",
        }
    }
}

/// Embedding collections recognized by the settings surface.
///
/// The collection name selects both the Qdrant collection and the embedding
/// backend that produced its vectors; the two must never be mixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionName {
    /// Pages embedded with `text-embedding-3-small`.
    #[serde(rename = "openai_embedded")]
    OpenaiEmbedded,
    /// Pages embedded with the local `multi-qa-mpnet-base-dot-v1` model.
    #[serde(rename = "multi-qa-mpnet-base-base_embedded")]
    MultiQaMpnet,
}

impl CollectionName {
    /// Qdrant collection name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenaiEmbedded => "openai_embedded",
            Self::MultiQaMpnet => "multi-qa-mpnet-base-base_embedded",
        }
    }

    /// Embedding model identifier passed to the matching provider.
    pub fn embedding_model(self) -> &'static str {
        match self {
            Self::OpenaiEmbedded => "text-embedding-3-small",
            Self::MultiQaMpnet => "multi-qa-mpnet-base-dot-v1",
        }
    }

    /// Dimensionality of the vectors stored in this collection.
    pub fn dimension(self) -> usize {
        match self {
            Self::OpenaiEmbedded => 1536,
            Self::MultiQaMpnet => 768,
        }
    }

    /// Provider that produced (and must query) this collection.
    pub fn provider(self) -> EmbeddingProvider {
        match self {
            Self::OpenaiEmbedded => EmbeddingProvider::OpenAI,
            Self::MultiQaMpnet => EmbeddingProvider::Ollama,
        }
    }
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI embeddings API.
    OpenAI,
}

/// Document subset filters recognized by the settings surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFilter {
    /// No filtering; search the whole collection.
    #[serde(rename = "all")]
    All,
    /// Restrict retrieval to the Arbeitslosengeld leaflet.
    #[serde(rename = "Arbeitslosengeld")]
    Arbeitslosengeld,
    /// Restrict retrieval to the Bürgergeld leaflet.
    #[serde(rename = "Bürgergeld")]
    Buergergeld,
}

impl DocumentFilter {
    /// Payload `topic` value to match, or `None` for no filtering.
    pub fn topic(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Arbeitslosengeld => Some("Arbeitslosengeld"),
            Self::Buergergeld => Some("Bürgergeld"),
        }
    }
}

/// Default confidence below which a German detection is treated as ambiguous.
pub const DEFAULT_GERMAN_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Errors raised by [`PipelineSettings::validate`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Temperature outside the accepted `[0, 2]` range.
    #[error("temperature {0} outside the accepted range [0, 2]")]
    TemperatureOutOfRange(f32),
    /// Seed outside the accepted `[0, 150]` range.
    #[error("seed {0} outside the accepted range [0, 150]")]
    SeedOutOfRange(u32),
    /// Confidence threshold outside `[0, 1]`.
    #[error("german confidence threshold {0} outside the accepted range [0, 1]")]
    ThresholdOutOfRange(f64),
}

/// Per-session settings driving the answering pipeline.
///
/// Immutable once applied; the chat service swaps in a freshly built pipeline
/// on every change so a turn never observes a half-updated configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Chat model used for both query expansion and answering.
    #[serde(default = "default_model")]
    pub model: ChatModel,
    /// Embedding collection (and thereby embedding backend) to search.
    #[serde(default = "default_collection")]
    pub collection: CollectionName,
    /// Document subset restriction passed through to the vector store.
    #[serde(default = "default_filter")]
    pub filter: DocumentFilter,
    /// Sampling temperature, `[0, 2]`.
    #[serde(default)]
    pub temperature: f32,
    /// Sampling seed, `[0, 150]`.
    #[serde(default = "default_seed")]
    pub seed: u32,
    /// Whether the original question is appended to the expanded query set.
    #[serde(default = "default_include_original")]
    pub include_original: bool,
    /// Confidence below which a German detection is retranslated defensively.
    #[serde(default = "default_threshold")]
    pub german_confidence_threshold: f64,
}

fn default_model() -> ChatModel {
    ChatModel::Gpt35Turbo0125
}

fn default_collection() -> CollectionName {
    CollectionName::OpenaiEmbedded
}

fn default_filter() -> DocumentFilter {
    DocumentFilter::All
}

fn default_seed() -> u32 {
    30
}

fn default_include_original() -> bool {
    true
}

fn default_threshold() -> f64 {
    DEFAULT_GERMAN_CONFIDENCE_THRESHOLD
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            collection: default_collection(),
            filter: default_filter(),
            temperature: 0.0,
            seed: default_seed(),
            include_original: default_include_original(),
            german_confidence_threshold: default_threshold(),
        }
    }
}

impl PipelineSettings {
    /// Check value ranges before the settings are applied.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(SettingsError::TemperatureOutOfRange(self.temperature));
        }
        if self.seed > 150 {
            return Err(SettingsError::SeedOutOfRange(self.seed));
        }
        if !(0.0..=1.0).contains(&self.german_confidence_threshold) {
            return Err(SettingsError::ThresholdOutOfRange(
                self.german_confidence_threshold,
            ));
        }
        Ok(())
    }
}
