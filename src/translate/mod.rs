//! Translation capability and the pre-retrieval routing decision.
//!
//! The translator is a fallible, network-bound collaborator. A failed
//! translation fails the whole turn: answering in the wrong language against
//! a German corpus is worse than returning no answer at all, so there is no
//! silent fallback to the untranslated question.

mod router;

pub use router::{RouteError, RoutingDecision, TranslationRouter};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced while translating a question.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// Translation backend was unreachable.
    #[error("Translation backend unavailable: {0}")]
    BackendUnavailable(String),
    /// Translation backend returned an error response.
    #[error("Translation request failed: {0}")]
    RequestFailed(String),
    /// Translation backend response could not be parsed.
    #[error("Malformed translator response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by translation backends.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source` into `target` (ISO codes, `auto` allowed
    /// as source).
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError>;
}

/// Translator speaking the LibreTranslate HTTP protocol.
pub struct HttpTranslator {
    http: Client,
    base_url: String,
}

impl HttpTranslator {
    /// Construct a client against the given backend base URL.
    pub fn new(base_url: String) -> Self {
        let http = Client::builder()
            .user_agent("formrag/translate")
            .build()
            .expect("Failed to construct reqwest::Client for translation");
        Self { http, base_url }
    }

    fn endpoint(&self) -> String {
        format!("{}/translate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let payload = json!({
            "q": text,
            "source": source,
            "target": target,
            "format": "text",
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                TranslationError::BackendUnavailable(format!(
                    "failed to reach translator at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(TranslationError::BackendUnavailable(format!(
                "translator endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::RequestFailed(format!(
                "translator returned {status}: {body}"
            )));
        }

        let body: TranslateResponse = response.json().await.map_err(|error| {
            TranslationError::InvalidResponse(format!(
                "failed to decode translator response: {error}"
            ))
        })?;

        tracing::debug!(source, target, "Question translated");
        Ok(body.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn translator_handles_successful_response() {
        let server = MockServer::start_async().await;
        let translator = HttpTranslator::new(server.base_url());

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/translate")
                    .json_body(json!({
                        "q": "How do I apply?",
                        "source": "auto",
                        "target": "de",
                        "format": "text",
                    }));
                then.status(200)
                    .json_body(json!({ "translatedText": "Wie beantrage ich?" }));
            })
            .await;

        let translated = translator
            .translate("How do I apply?", "auto", "de")
            .await
            .expect("translation");

        mock.assert();
        assert_eq!(translated, "Wie beantrage ich?");
    }

    #[tokio::test]
    async fn translator_surfaces_error_status() {
        let server = MockServer::start_async().await;
        let translator = HttpTranslator::new(server.base_url());

        server
            .mock_async(|when, then| {
                when.method(POST).path("/translate");
                then.status(500).body("boom");
            })
            .await;

        let error = translator
            .translate("How do I apply?", "auto", "de")
            .await
            .expect_err("error response");
        assert!(matches!(error, TranslationError::RequestFailed(_)));
    }
}
