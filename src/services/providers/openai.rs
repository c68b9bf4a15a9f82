/// OpenAI-compatible embeddings provider
///
/// Calls `POST {api_url}/embeddings` with a batch of inputs. The response
/// items carry their input index, which is used to restore input order.
use crate::{
    config::Config,
    error::{AppError, AppResult},
    services::providers::EmbeddingProvider,
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub struct OpenAiEmbeddings {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    pub fn new(api_key: String, api_url: String, model: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    /// Builds the provider from configuration; fails when no API key is set
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.require_api_key()?.to_string(),
            config.embedding_api_url.clone(),
            config.embedding_model.clone(),
            config.embedding_timeout(),
        )
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    #[tracing::instrument(skip(self, texts), fields(model = %self.model, batch = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.api_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "Embedding API returned status {}: {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Initialization(format!(
                "Embedding API rejected the request with status {}: {}",
                status, body
            )));
        }

        let mut payload: EmbeddingResponse = response.json().await?;
        payload.data.sort_by_key(|item| item.index);

        tracing::debug!(
            provider = self.name(),
            batch = texts.len(),
            "Embedded batch"
        );

        Ok(payload.data.into_iter().map(|item| item.embedding).collect())
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_embed_batch_restores_input_order() {
        // Items come back out of order and must be sorted by index
        let router = Router::new().route(
            "/embeddings",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "text-embedding-3-large");
                Json(json!({
                    "data": [
                        {"index": 1, "embedding": [0.0, 1.0]},
                        {"index": 0, "embedding": [1.0, 0.0]}
                    ]
                }))
            }),
        );
        let url = serve(router).await;

        let provider = OpenAiEmbeddings::new(
            "test-key".to_string(),
            url,
            "text-embedding-3-large".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        let vectors = provider
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let router = Router::new().route(
            "/embeddings",
            post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        );
        let url = serve(router).await;

        let provider = OpenAiEmbeddings::new(
            "test-key".to_string(),
            url,
            "m".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        let err = provider.embed_batch(&["x".to_string()]).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_transient() {
        let router = Router::new().route("/embeddings", post(|| async { "not an embedding payload" }));
        let url = serve(router).await;

        let provider = OpenAiEmbeddings::new(
            "test-key".to_string(),
            url,
            "m".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        let err = provider.embed_batch(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, AppError::HttpClient(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_rejected_request_is_not_retried() {
        let router = Router::new().route(
            "/embeddings",
            post(|| async { (axum::http::StatusCode::BAD_REQUEST, "input too long") }),
        );
        let url = serve(router).await;

        let provider = OpenAiEmbeddings::new(
            "test-key".to_string(),
            url,
            "m".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        let err = provider.embed_batch(&["x".to_string()]).await.unwrap_err();
        assert!(!err.is_transient());
    }
}
