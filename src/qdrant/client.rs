//! HTTP client wrapper for interacting with Qdrant.

use crate::config::get_config;
use crate::qdrant::{
    payload::{build_payload, current_timestamp_rfc3339, generate_point_id},
    types::{
        ListCollectionsResponse, PointInsert, QdrantError, QueryResponse, QueryResponseResult,
        ScoredPoint,
    },
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

/// Lightweight HTTP client for Qdrant operations.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, QdrantError> {
        let config = get_config();
        let client = Client::builder().user_agent("formrag/0.1").build()?;

        let base_url = normalize_base_url(&config.qdrant_url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(url = %base_url, "Initialized Qdrant HTTP client");

        Ok(Self {
            client,
            base_url,
            api_key: config.qdrant_api_key.clone(),
        })
    }

    /// Perform a similarity search against a collection, returning scored payloads.
    pub async fn search_points(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        filter: Option<Value>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let mut body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(filter_value) = filter
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("filter".into(), filter_value);
        }

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/query"),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = collection_name, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points, .. } => points,
        };
        let results = points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect();

        Ok(results)
    }

    /// Upload new page vectors to the given collection.
    pub async fn index_points(
        &self,
        collection_name: &str,
        points: Vec<PointInsert>,
    ) -> Result<Vec<String>, QdrantError> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let now = current_timestamp_rfc3339();
        let mut ids = Vec::with_capacity(points.len());
        let serialized: Vec<_> = points
            .into_iter()
            .map(|point| {
                let point_id = generate_point_id();
                let payload =
                    build_payload(&point.text, &point.content_hash, &now, &point.payload);
                ids.push(point_id.clone());
                json!({
                    "id": point_id,
                    "vector": point.vector,
                    "payload": payload,
                })
            })
            .collect();

        let point_count = serialized.len();
        let response = self
            .request(
                Method::PUT,
                &format!("collections/{collection_name}/points"),
            )
            .query(&[("wait", true)])
            .json(&json!({ "points": serialized }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = collection_name,
                points = point_count,
                "Points indexed"
            );
        })
        .await?;

        Ok(ids)
    }

    /// Create a collection only when it is missing from Qdrant.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(collection_name).await? {
            return Ok(());
        }

        tracing::debug!(
            collection = collection_name,
            vector_size,
            "Creating collection"
        );
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, "Collection created");
        })
        .await
    }

    /// Retrieve the names of all collections present in Qdrant.
    pub async fn list_collections(&self) -> Result<Vec<String>, QdrantError> {
        let response = self.request(Method::GET, "collections").send().await?;

        if response.status().is_success() {
            let payload: ListCollectionsResponse = response.json().await?;
            let names = payload
                .result
                .collections
                .into_iter()
                .map(|collection| collection.name)
                .collect();
            Ok(names)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Failed to list collections");
            Err(error)
        }
    }

    async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(map) => map
            .get("uuid")
            .map(|value| match value {
                Value::String(uuid) => uuid.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map).to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentFilter;
    use crate::qdrant::build_topic_filter;
    use httpmock::{Method::POST, MockServer};
    use reqwest::Client;

    fn service(base_url: String) -> QdrantService {
        QdrantService {
            client: Client::builder()
                .user_agent("formrag-test")
                .build()
                .expect("client"),
            base_url,
            api_key: None,
        }
    }

    #[tokio::test]
    async fn search_points_emits_expected_request() {
        let server = MockServer::start_async().await;

        let filter = build_topic_filter(DocumentFilter::Arbeitslosengeld).expect("filter value");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/openai_embedded/points/query");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": [
                        {
                            "id": "page-1",
                            "score": 0.42,
                            "payload": {
                                "text": "Arbeitslosengeld wird auf Antrag gezahlt.",
                                "page": 7,
                                "topic": "Arbeitslosengeld"
                            }
                        }
                    ]
                }));
            })
            .await;

        let results = service(server.base_url())
            .search_points("openai_embedded", vec![0.1, 0.2], Some(filter), 4)
            .await
            .expect("search request");

        mock.assert();

        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert_eq!(hit.id, "page-1");
        assert!((hit.score - 0.42).abs() < f32::EPSILON);
        let payload = hit.payload.as_ref().expect("payload");
        assert_eq!(
            payload["text"],
            Value::String("Arbeitslosengeld wird auf Antrag gezahlt.".into())
        );
        assert_eq!(payload["page"], json!(7));
    }

    #[tokio::test]
    async fn search_surfaces_unexpected_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/openai_embedded/points/query");
                then.status(503).body("unavailable");
            })
            .await;

        let error = service(server.base_url())
            .search_points("openai_embedded", vec![0.1], None, 4)
            .await
            .expect_err("error status");
        assert!(matches!(error, QdrantError::UnexpectedStatus { .. }));
    }
}
