//! Client for an OpenAI-compatible chat-completions endpoint.
//!
//! Query expansion uses the non-streaming call; the grounded answer uses the
//! streaming call and re-yields SSE deltas as plain tokens.

use crate::llm::{CompletionError, CompletionParams, LlmClient, TokenStream};
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Chat-completions client speaking the OpenAI HTTP protocol.
pub struct OpenAiChatClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    params: CompletionParams,
}

impl OpenAiChatClient {
    /// Construct a client against the given endpoint with fixed sampling parameters.
    pub fn new(base_url: String, api_key: Option<String>, params: CompletionParams) -> Self {
        let http = Client::builder()
            .user_agent("formrag/llm")
            .build()
            .expect("Failed to construct reqwest::Client for completions");
        Self {
            http,
            base_url,
            api_key,
            params,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn send_request(
        &self,
        prompt: &str,
        stream: bool,
    ) -> Result<reqwest::Response, CompletionError> {
        let payload = json!({
            "model": self.params.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.params.temperature,
            "seed": self.params.seed,
            "stream": stream,
        });

        let mut request = self.http.post(self.endpoint()).json(&payload);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|error| {
            CompletionError::BackendUnavailable(format!(
                "failed to reach completions endpoint at {}: {error}",
                self.base_url
            ))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::RequestFailed(format!(
                "completions endpoint returned {status}: {body}"
            )));
        }

        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let response = self.send_request(prompt, false).await?;
        let body: CompletionResponse = response.json().await.map_err(|error| {
            CompletionError::InvalidResponse(format!(
                "failed to decode completion response: {error}"
            ))
        })?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::InvalidResponse("response had no choices".into()))?;
        Ok(choice.message.content)
    }

    async fn stream(&self, prompt: &str) -> Result<TokenStream, CompletionError> {
        let response = self.send_request(prompt, true).await?;
        let mut bytes = response.bytes_stream();

        let tokens = try_stream! {
            // Raw byte buffer: SSE chunk boundaries do not respect UTF-8
            // character boundaries, so lines are cut on b'\n' first.
            let mut buffer: Vec<u8> = Vec::new();
            'body: while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|error| {
                    CompletionError::StreamInterrupted(error.to_string())
                })?;
                buffer.extend_from_slice(&chunk);

                while let Some(newline) = buffer.iter().position(|byte| *byte == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();
                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        buffer.clear();
                        break 'body;
                    }
                    let parsed: StreamChunk = serde_json::from_str(data).map_err(|error| {
                        CompletionError::InvalidResponse(format!(
                            "failed to decode stream chunk: {error}"
                        ))
                    })?;
                    for choice in parsed.choices {
                        if let Some(content) = choice.delta.content
                            && !content.is_empty()
                        {
                            yield content;
                        }
                    }
                }
            }

            // A final data line may arrive without a trailing newline when the
            // body ends without the sentinel.
            let line = String::from_utf8_lossy(&buffer);
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:")
                && data.trim() != "[DONE]"
                && !data.trim().is_empty()
            {
                let parsed: StreamChunk = serde_json::from_str(data.trim()).map_err(|error| {
                    CompletionError::InvalidResponse(format!(
                        "failed to decode stream chunk: {error}"
                    ))
                })?;
                for choice in parsed.choices {
                    if let Some(content) = choice.delta.content
                        && !content.is_empty()
                    {
                        yield content;
                    }
                }
            }
        };

        Ok(Box::pin(tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use httpmock::{Method::POST, MockServer};

    fn client(base_url: String) -> OpenAiChatClient {
        OpenAiChatClient::new(
            base_url,
            None,
            CompletionParams {
                model: "gpt-3.5-turbo-0125".into(),
                temperature: 0.0,
                seed: 30,
            },
        )
    }

    #[tokio::test]
    async fn complete_returns_message_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .json_body_partial(r#"{ "stream": false, "seed": 30 }"#);
                then.status(200).json_body(json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "Erste Zeile\nZweite Zeile" } }
                    ]
                }));
            })
            .await;

        let content = client(server.base_url())
            .complete("Formuliere die Frage um.")
            .await
            .expect("completion");

        mock.assert();
        assert_eq!(content, "Erste Zeile\nZweite Zeile");
    }

    #[tokio::test]
    async fn stream_yields_tokens_until_done() {
        let server = MockServer::start_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Arbeits\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"losengeld\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{}}]}\n\n",
            "data: [DONE]\n\n",
        );
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body(body);
            })
            .await;

        let mut tokens = client(server.base_url())
            .stream("Wer bekommt Arbeitslosengeld?")
            .await
            .expect("stream start");

        let mut collected = String::new();
        while let Some(token) = tokens.next().await {
            collected.push_str(&token.expect("token"));
        }
        assert_eq!(collected, "Arbeitslosengeld");
    }

    #[tokio::test]
    async fn stream_flushes_final_line_without_trailing_newline() {
        let server = MockServer::start_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Bürger\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"geld\"}}]}",
        );
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body(body);
            })
            .await;

        let mut tokens = client(server.base_url())
            .stream("Was ist Bürgergeld?")
            .await
            .expect("stream start");

        let mut collected = String::new();
        while let Some(token) = tokens.next().await {
            collected.push_str(&token.expect("token"));
        }
        assert_eq!(collected, "Bürgergeld");
    }

    #[tokio::test]
    async fn error_status_fails_before_streaming() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let Err(error) = client(server.base_url()).stream("frage").await else {
            panic!("error status expected");
        };
        assert!(matches!(error, CompletionError::RequestFailed(_)));
    }
}
