use std::{env, sync::Arc};

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use formrag::{api, chat::ChatService, config};
use httpmock::{Method::POST, MockServer};
use serde_json::{Value, json};
use tower::ServiceExt;

fn set_env(key: &str, value: &str) {
    // SAFETY: Tests run in a single process and establish deterministic
    // configuration upfront.
    unsafe {
        env::set_var(key, value);
    }
}

async fn mount_backends(llm: &MockServer, qdrant: &MockServer, translator: &MockServer) {
    // Expansion call: non-streaming completion, three German phrasings.
    llm.mock_async(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .json_body_partial(r#"{ "stream": false }"#);
        then.status(200).json_body(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Wer hat Anspruch auf Arbeitslosengeld?\nWelche Voraussetzungen gelten?\nWann wird gezahlt?"
                }
            }]
        }));
    })
    .await;

    // Answer call: streaming completion.
    let sse = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Arbeitslosengeld \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"erhalten \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Versicherte.\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    llm.mock_async(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .json_body_partial(r#"{ "stream": true }"#);
        then.status(200)
            .header("content-type", "text/event-stream")
            .body(sse);
    })
    .await;

    // One embedding per retrieval query.
    llm.mock_async(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200)
            .json_body(json!({ "data": [{ "embedding": [0.1, 0.2, 0.3] }] }));
    })
    .await;

    // Every query hits the same page, so the deduplicated context holds one
    // document.
    qdrant
        .mock_async(|when, then| {
            when.method(POST)
                .path("/collections/openai_embedded/points/query");
            then.status(200).json_body(json!({
                "status": "ok",
                "time": 0.0,
                "result": [{
                    "id": "page-4",
                    "score": 0.87,
                    "payload": {
                        "text": "Arbeitslosengeld erhalten Versicherte nach einer Kündigung.",
                        "page": 4,
                        "topic": "Arbeitslosengeld"
                    }
                }]
            }));
        })
        .await;

    // Whatlang confidence on short questions varies, so the router may ask for
    // a defensive retranslation; echoing the question back keeps the turn
    // deterministic either way.
    translator
        .mock_async(|when, then| {
            when.method(POST).path("/translate");
            then.status(200).json_body(json!({
                "translatedText": "Wer bekommt Arbeitslosengeld?"
            }));
        })
        .await;
}

#[tokio::test]
async fn chat_turn_streams_context_question_and_tokens() {
    let llm = MockServer::start_async().await;
    let qdrant = MockServer::start_async().await;
    let translator = MockServer::start_async().await;

    set_env("QDRANT_URL", &qdrant.base_url());
    set_env("TRANSLATOR_URL", &translator.base_url());
    set_env("LLM_BASE_URL", &llm.base_url());
    config::init_config();

    mount_backends(&llm, &qdrant, &translator).await;

    let service = Arc::new(ChatService::new().expect("chat service"));
    let app = api::create_router(service);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/chat")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "question": "Wer bekommt Arbeitslosengeld?" }).to_string(),
                ))
                .expect("request"),
        )
        .await
        .expect("chat response");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let lines: Vec<Value> = String::from_utf8(bytes.to_vec())
        .expect("utf8 body")
        .lines()
        .map(|line| serde_json::from_str(line).expect("ndjson line"))
        .collect();

    let context = lines
        .iter()
        .find_map(|line| line.get("context"))
        .expect("context event");
    let queries = context["queries"].as_array().expect("queries");
    assert_eq!(queries.len(), 4);
    assert_eq!(
        queries.last().expect("original query"),
        "Wer bekommt Arbeitslosengeld?"
    );
    let documents = context["documents"].as_array().expect("documents");
    assert_eq!(documents.len(), 1, "identical hits deduplicate");
    assert_eq!(
        documents[0]["content"],
        "Arbeitslosengeld erhalten Versicherte nach einer Kündigung."
    );

    let question = lines
        .iter()
        .find_map(|line| line.get("question"))
        .expect("question event");
    assert_eq!(question, "Wer bekommt Arbeitslosengeld?");

    let answer: String = lines
        .iter()
        .filter_map(|line| line.get("token"))
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(answer, "Arbeitslosengeld erhalten Versicherte.");

    // The turn and its retrieval show up in the counters.
    let metrics = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/metrics")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("metrics response");
    assert_eq!(metrics.status(), StatusCode::OK);
    let bytes = to_bytes(metrics.into_body(), usize::MAX)
        .await
        .expect("metrics bytes");
    let snapshot: Value = serde_json::from_slice(&bytes).expect("metrics json");
    assert_eq!(snapshot["turns_answered"], 1);
    assert_eq!(snapshot["queries_expanded"], 4);
    assert_eq!(snapshot["documents_retrieved"], 1);
}
