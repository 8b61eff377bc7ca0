//! Embedding generation
//!
//! Two implementations sit behind the [`Embedder`] trait: a deterministic
//! local embedder (SHA-256 token hashing, normalized) that needs no network,
//! and an OpenAI-compatible HTTP client.

use async_trait::async_trait;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DIMENSION: usize = 384;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Embedding response malformed: {0}")]
    Response(String),
}

/// External embedding model: text in, fixed-dimension vector out.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dimension(&self) -> usize;
}

/// Cosine similarity between two vectors. Mismatched dimensions or zero
/// magnitudes score 0.0 rather than erroring.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

/// Deterministic local embedder.
///
/// Hashes the lowercased token stream and expands the digest into a
/// normalized vector. Same text always produces the same vector, which keeps
/// ingestion counts and retrieval reproducible without a model service.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();

        let mut hasher = Sha256::new();
        hasher.update(tokens.join(" ").to_lowercase().as_bytes());
        let hash = hasher.finalize();

        let mut vector = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            let byte = hash[i % hash.len()];
            // Map each byte into [-1, 1].
            vector.push((byte as f32 / 255.0) * 2.0 - 1.0);
        }

        normalize(&mut vector);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}

// --- OpenAI-compatible serde structs ---

#[derive(serde::Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(serde::Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(serde::Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl HttpEmbedder {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        model: &str,
        dimension: usize,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Request(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Response(e.to_string()))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Response("no embedding in response".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::Response(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("Hello world").await.unwrap();
        let b = embedder.embed("Hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_DIMENSION);
    }

    #[tokio::test]
    async fn hash_embedder_output_is_normalized() {
        let embedder = HashEmbedder::default();
        let v = embedder.embed("some text to embed").await.unwrap();
        let magnitude = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn different_texts_embed_differently() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("first document").await.unwrap();
        let b = embedder.embed("second document").await.unwrap();
        assert_ne!(a, b);
    }

    /// Serve a canned embeddings response on a loopback port.
    async fn spawn_embedding_server(embedding: Vec<f32>) -> String {
        use axum::{routing::post, Json, Router};

        let app = Router::new().route(
            "/v1/embeddings",
            post(move || async move {
                Json(serde_json::json!({ "data": [{ "embedding": embedding }] }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn http_embedder_accepts_matching_dimension() {
        let endpoint = spawn_embedding_server(vec![0.5; 4]).await;
        let embedder = HttpEmbedder::new(&endpoint, "key", "model", 4).unwrap();
        let v = embedder.embed("some text").await.unwrap();
        assert_eq!(v.len(), embedder.dimension());
    }

    #[tokio::test]
    async fn http_embedder_rejects_mismatched_dimension() {
        let endpoint = spawn_embedding_server(vec![0.5; 8]).await;
        let embedder = HttpEmbedder::new(&endpoint, "key", "model", 4).unwrap();
        let err = embedder.embed("some text").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Response(_)));
    }

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![0.5, -0.2, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_handles_degenerate_input() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
