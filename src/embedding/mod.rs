//! Embedding model construction from configuration.
//!
//! Every provider implements [`TokenEmbedder`] and is wrapped by the
//! composition root in an [`EmbeddingAdapter`], which pools and
//! normalizes its output:
//!
//! - **`hashing`**: [`HashingEmbedder`], deterministic and offline.
//! - **`openai`**: [`OpenAIEmbedder`], `POST /v1/embeddings`. Returns the
//!   pooled sentence vector as a single row.
//! - **`ollama`**: [`OllamaEmbedder`], `POST /api/embed` on a local
//!   Ollama instance. Single row, like OpenAI.
//! - **`local`**: `LocalEmbedder` (feature `local-embeddings-tract`),
//!   runs an ONNX sentence-transformer with tract and returns one row per
//!   token.
//!
//! # Retry Strategy
//!
//! Remote providers use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

#[cfg(feature = "local-embeddings-tract")]
mod local_tract;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub use civic_match_core::embedding::{EmbeddingAdapter, HashingEmbedder, TokenEmbedder};

use crate::config::EmbeddingConfig;

#[cfg(feature = "local-embeddings-tract")]
pub use local_tract::LocalEmbedder;

const OPENAI_URL: &str = "https://api.openai.com/v1/embeddings";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Build the configured model. Model files are loaded here, once.
///
/// # Errors
///
/// Unknown provider names, missing settings (model, API key), or a
/// `local` provider without the `local-embeddings-tract` feature.
pub async fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn TokenEmbedder>> {
    match config.provider.as_str() {
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.dims))),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings-tract")]
        "local" => Ok(Arc::new(LocalEmbedder::load(config).await?)),
        #[cfg(not(feature = "local-embeddings-tract"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings-tract"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// [`create_embedder`] wrapped in an adapter.
pub async fn create_adapter(config: &EmbeddingConfig) -> Result<EmbeddingAdapter> {
    Ok(EmbeddingAdapter::new(create_embedder(config).await?))
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// POST `body` to `url`, retrying transient failures, and return the
/// parsed JSON response.
async fn post_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
    service: &str,
) -> Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            debug!(service, attempt, delay_secs = delay.as_secs(), "retrying embedding request");
            tokio::time::sleep(delay).await;
        }

        let mut request = client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(key) = bearer {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                let body_text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    warn!(service, %status, "transient embedding API error");
                    last_err = Some(anyhow!("{} API error {}: {}", service, status, body_text));
                    continue;
                }

                bail!("{} API error {}: {}", service, status, body_text);
            }
            Err(e) => {
                warn!(service, error = %e, "embedding request failed");
                last_err = Some(anyhow!("{} connection error ({}): {}", service, url, e));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("{} embedding failed after retries", service)))
}

fn json_to_vector(value: &serde_json::Value, what: &str) -> Result<Vec<f32>> {
    let items = value
        .as_array()
        .ok_or_else(|| anyhow!("Invalid {} response: embedding is not an array", what))?;
    Ok(items
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

// ============ OpenAI ============

/// Embedding model behind the OpenAI embeddings API.
///
/// Requires `OPENAI_API_KEY`. For `text-embedding-3-*` models the
/// configured `dims` is sent as `dimensions`.
pub struct OpenAIEmbedder {
    model: String,
    dims: usize,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            dims: config.dims,
            api_key,
            max_retries: config.max_retries,
            client: http_client(config.timeout_secs)?,
        })
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });
        if self.model.starts_with("text-embedding-3") {
            body["dimensions"] = serde_json::json!(self.dims);
        }
        body
    }
}

#[async_trait]
impl TokenEmbedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_tokens(&self, text: &str) -> Result<Vec<Vec<f32>>> {
        let json = post_json_with_retry(
            &self.client,
            OPENAI_URL,
            Some(&self.api_key),
            &self.request_body(text),
            self.max_retries,
            "OpenAI",
        )
        .await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[].embedding` rows.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    data.iter()
        .map(|item| {
            let embedding = item
                .get("embedding")
                .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;
            json_to_vector(embedding, "OpenAI")
        })
        .collect()
}

// ============ Ollama ============

/// Embedding model served by a local Ollama instance.
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string());

        Ok(Self {
            model,
            dims: config.dims,
            url,
            max_retries: config.max_retries,
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl TokenEmbedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_tokens(&self, text: &str) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });
        let json = post_json_with_retry(
            &self.client,
            &format!("{}/api/embed", self.url.trim_end_matches('/')),
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))?;

    embeddings
        .iter()
        .map(|e| json_to_vector(e, "Ollama"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Reads one HTTP request, headers and body.
    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    return;
                }
            }
        }
    }

    /// Serves `responses` in order, one per connection (repeating the last),
    /// and counts requests.
    async fn canned_server(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/v1/embeddings", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                read_request(&mut stream).await;
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = responses[n.min(responses.len() - 1)];
                let response = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });
        (url, hits)
    }

    async fn post(url: &str) -> Result<serde_json::Value> {
        let client = http_client(5).unwrap();
        let body = serde_json::json!({ "model": "m", "input": ["school funding"] });
        post_json_with_retry(&client, url, Some("key"), &body, 1, "Test").await
    }

    #[tokio::test]
    async fn test_client_error_fails_without_retry() {
        let (url, hits) = canned_server(vec![(400, r#"{"error":"bad input"}"#)]).await;
        let err = post(&url).await.unwrap_err();
        assert!(err.to_string().contains("400"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let (url, hits) = canned_server(vec![
            (429, r#"{"error":"slow down"}"#),
            (200, r#"{"data":[{"embedding":[1.0,0.0]}]}"#),
        ])
        .await;
        let json = post(&url).await.unwrap();
        assert_eq!(parse_openai_response(&json).unwrap(), vec![vec![1.0f32, 0.0]]);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_server_error_exhausts_retries() {
        let (url, hits) = canned_server(vec![(503, r#"{"error":"unavailable"}"#)]).await;
        let err = post(&url).await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connection_error_is_retried() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/v1/embeddings", listener.local_addr().unwrap());
        drop(listener);
        let err = post(&url).await.unwrap_err();
        assert!(err.to_string().contains("connection error"));
    }

    #[tokio::test]
    async fn test_hashing_provider_from_config() {
        let config = EmbeddingConfig {
            dims: 32,
            ..EmbeddingConfig::default()
        };
        let adapter = create_adapter(&config).await.unwrap();
        assert_eq!(adapter.model_name(), "hashing");
        assert_eq!(adapter.dims(), 32);
        let v = adapter.embed("school funding").await.unwrap();
        assert_eq!(v.len(), 32);
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "magic".to_string(),
            ..EmbeddingConfig::default()
        };
        let err = create_embedder(&config).await.err().unwrap();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_ollama_requires_model() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_embedder(&config).await.is_err());
    }

    #[test]
    fn test_parse_openai_response() {
        let json = serde_json::json!({
            "data": [{ "index": 0, "embedding": [0.5, -0.25, 1.0] }]
        });
        let rows = parse_openai_response(&json).unwrap();
        assert_eq!(rows, vec![vec![0.5f32, -0.25, 1.0]]);
        assert!(parse_openai_response(&serde_json::json!({})).is_err());
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = serde_json::json!({ "embeddings": [[1.0, 2.0]] });
        assert_eq!(parse_ollama_response(&json).unwrap(), vec![vec![1.0f32, 2.0]]);
        let bad = serde_json::json!({ "embeddings": [1.0] });
        assert!(parse_ollama_response(&bad).is_err());
    }
}
