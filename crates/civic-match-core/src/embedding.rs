//! Embedding adapter: turns an external per-token embedding model into one
//! normalized vector per text.
//!
//! The model is a replaceable collaborator behind [`TokenEmbedder`]. It
//! returns one vector per token; [`EmbeddingAdapter::embed`] mean-pools
//! over the token dimension and L2-normalizes the result. The adapter is
//! constructed once by the composition root, passed by reference into the
//! ranker and explainer, and shut down explicitly. There is no global
//! model handle and no cache.
//!
//! [`HashingEmbedder`] is a deterministic, offline model: each lower-cased
//! token maps to a pseudo-random vector derived from its SHA-256 digest.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// An external embedding model.
///
/// Implementations must be deterministic: the same text yields the same
/// token vectors, each of length [`dims`](TokenEmbedder::dims). Models
/// that only expose a pooled sentence vector may return it as a single
/// row; pooling one row is the identity.
#[async_trait]
pub trait TokenEmbedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the per-token vector dimensionality.
    fn dims(&self) -> usize;
    /// Embed a text into one vector per token.
    async fn embed_tokens(&self, text: &str) -> Result<Vec<Vec<f32>>>;
    /// Release model resources. Called once by [`EmbeddingAdapter::shutdown`].
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Mean of the token rows. No rows pool to the zero vector.
pub fn mean_pool(tokens: &[Vec<f32>], dims: usize) -> Vec<f32> {
    let mut sum = vec![0f32; dims];
    if tokens.is_empty() {
        return sum;
    }
    for row in tokens {
        for (acc, &v) in sum.iter_mut().zip(row.iter()) {
            *acc += v;
        }
    }
    let count = tokens.len() as f32;
    for x in &mut sum {
        *x /= count;
    }
    sum
}

/// Scale to unit length. Near-zero vectors are returned unchanged.
pub fn normalize_l2(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-9 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Pools and normalizes a [`TokenEmbedder`]'s output.
#[derive(Clone)]
pub struct EmbeddingAdapter {
    model: Arc<dyn TokenEmbedder>,
}

impl EmbeddingAdapter {
    pub fn new(model: Arc<dyn TokenEmbedder>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn dims(&self) -> usize {
        self.model.dims()
    }

    /// Embed `text` into a mean-pooled, L2-normalized vector of length
    /// [`dims`](Self::dims).
    ///
    /// # Errors
    ///
    /// Fails if the model call fails or returns a row whose length is not
    /// `dims`. Vectors of different dimensions are never compared.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let dims = self.model.dims();
        let tokens = self
            .model
            .embed_tokens(text)
            .await
            .with_context(|| format!("Embedding model '{}' failed", self.model.model_name()))?;

        if let Some(bad) = tokens.iter().find(|row| row.len() != dims) {
            bail!(
                "Embedding model '{}' returned a {}-dim token vector, expected {}",
                self.model.model_name(),
                bad.len(),
                dims
            );
        }

        Ok(normalize_l2(mean_pool(&tokens, dims)))
    }

    /// Shut down the underlying model.
    pub async fn shutdown(self) -> Result<()> {
        self.model.shutdown().await
    }
}

impl std::fmt::Debug for EmbeddingAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingAdapter")
            .field("model", &self.model.model_name())
            .field("dims", &self.model.dims())
            .finish()
    }
}

/// Deterministic token-hash embedding model.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub const MODEL_NAME: &'static str = "hashing";

    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn token_vector(&self, token: &str) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.dims);
        let mut block: u32 = 0;
        while out.len() < self.dims {
            let mut hasher = Sha256::new();
            hasher.update(token.as_bytes());
            hasher.update(block.to_le_bytes());
            let digest = hasher.finalize();
            for &byte in digest.iter() {
                if out.len() == self.dims {
                    break;
                }
                out.push(f32::from(byte) / 127.5 - 1.0);
            }
            block += 1;
        }
        out
    }
}

#[async_trait]
impl TokenEmbedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_tokens(&self, text: &str) -> Result<Vec<Vec<f32>>> {
        Ok(text
            .split_whitespace()
            .map(|t| self.token_vector(&t.to_lowercase()))
            .collect())
    }
}
