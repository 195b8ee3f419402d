//! Local sentence-transformer inference with tract (pure Rust, no ONNX
//! Runtime).
//!
//! The ONNX model and tokenizer are downloaded from Hugging Face on first
//! use and cached under `~/.cache/civic-match/models`. [`LocalEmbedder::load`]
//! optimizes the graph once; every embedding call reuses that plan until
//! `shutdown`. Inference runs in `spawn_blocking` and returns the model's
//! last hidden state: one row per input token. Pooling happens in the
//! adapter.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tract_onnx::prelude::*;

use civic_match_core::embedding::TokenEmbedder;

use crate::config::EmbeddingConfig;

const DEFAULT_MODEL: &str = "all-minilm-l6-v2";
const MAX_TOKENS: usize = 256;

struct ModelManifest {
    repo: &'static str,
    onnx: &'static str,
    tokenizer: &'static str,
    dims: usize,
}

fn model_manifest(model_name: &str) -> Result<ModelManifest> {
    match model_name {
        "all-minilm-l6-v2" => Ok(ModelManifest {
            repo: "sentence-transformers/all-MiniLM-L6-v2",
            onnx: "onnx/model.onnx",
            tokenizer: "tokenizer.json",
            dims: 384,
        }),
        "bge-small-en-v1.5" => Ok(ModelManifest {
            repo: "BAAI/bge-small-en-v1.5",
            onnx: "onnx/model.onnx",
            tokenizer: "tokenizer.json",
            dims: 384,
        }),
        other => bail!(
            "Local provider supports all-minilm-l6-v2 and bge-small-en-v1.5. Requested: '{}'",
            other
        ),
    }
}

fn cache_dir() -> Result<PathBuf> {
    let base = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let dir = PathBuf::from(base)
        .join(".cache")
        .join("civic-match")
        .join("models");
    std::fs::create_dir_all(&dir).map_err(|e| anyhow!("Create cache dir: {}", e))?;
    Ok(dir)
}

fn download_to_cache(repo: &str, path: &str, cache_path: &Path) -> Result<()> {
    if cache_path.exists() {
        return Ok(());
    }
    let url = format!("https://huggingface.co/{}/resolve/main/{}", repo, path);
    tracing::info!(%url, "downloading model file");
    let bytes = reqwest::blocking::get(&url)
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.bytes())
        .map_err(|e| anyhow!("Download {}: {}", url, e))?;
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| anyhow!("Create cache parent: {}", e))?;
    }
    std::fs::write(cache_path, &bytes).map_err(|e| anyhow!("Write cache: {}", e))?;
    Ok(())
}

type RunPlan = dyn Fn(TVec<TValue>) -> TractResult<TVec<TValue>> + Send + Sync;

/// Tokenizer and optimized tract plan, built once per embedder.
struct LoadedModel {
    tokenizer: tokenizers::Tokenizer,
    run: Box<RunPlan>,
}

/// Token-level embeddings from a local ONNX model.
pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    loaded: RwLock<Option<Arc<LoadedModel>>>,
}

impl LocalEmbedder {
    /// Resolve the model, download it if needed, and build the runnable
    /// plan.
    ///
    /// # Errors
    ///
    /// Unknown model names, a configured `dims` that disagrees with the
    /// model's hidden size, or download and load failures.
    pub async fn load(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let manifest = model_manifest(&model_name)?;
        if config.dims != manifest.dims {
            bail!(
                "embedding.dims = {} but model '{}' produces {}-dim vectors",
                config.dims,
                model_name,
                manifest.dims
            );
        }

        let dims = manifest.dims;
        let name = model_name.clone();
        let loaded = tokio::task::spawn_blocking(move || load_model(&name, &manifest)).await??;
        tracing::info!(model = %model_name, "local embedding model ready");

        Ok(Self {
            model_name,
            dims,
            loaded: RwLock::new(Some(Arc::new(loaded))),
        })
    }

    fn model(&self) -> Result<Arc<LoadedModel>> {
        self.loaded
            .read()
            .map_err(|_| anyhow!("Local model lock poisoned"))?
            .clone()
            .ok_or_else(|| anyhow!("Local model '{}' has been shut down", self.model_name))
    }
}

#[async_trait]
impl TokenEmbedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_tokens(&self, text: &str) -> Result<Vec<Vec<f32>>> {
        let model = self.model()?;
        let text = text.to_string();
        tokio::task::spawn_blocking(move || run_tract(&model, &text)).await?
    }

    async fn shutdown(&self) -> Result<()> {
        self.loaded
            .write()
            .map_err(|_| anyhow!("Local model lock poisoned"))?
            .take();
        Ok(())
    }
}

fn load_model(model_name: &str, manifest: &ModelManifest) -> Result<LoadedModel> {
    let model_dir = cache_dir()?.join(model_name);
    let onnx_path = model_dir.join(manifest.onnx);
    let tokenizer_path = model_dir.join(manifest.tokenizer);
    download_to_cache(manifest.repo, manifest.onnx, &onnx_path)?;
    download_to_cache(manifest.repo, manifest.tokenizer, &tokenizer_path)?;

    let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| anyhow!("Load tokenizer: {}", e))?;
    let plan = tract_onnx::onnx()
        .model_for_path(&onnx_path)
        .map_err(|e| anyhow!("Load ONNX: {}", e))?
        .into_optimized()
        .map_err(|e| anyhow!("Optimize: {}", e))?
        .into_runnable()
        .map_err(|e| anyhow!("Build tract runnable: {}", e))?;

    Ok(LoadedModel {
        tokenizer,
        run: Box::new(move |inputs| plan.run(inputs)),
    })
}

fn run_tract(model: &LoadedModel, text: &str) -> Result<Vec<Vec<f32>>> {
    let encoding = model
        .tokenizer
        .encode(text, true)
        .map_err(|e| anyhow!("Tokenize: {}", e))?;
    let ids: Vec<i64> = encoding
        .get_ids()
        .iter()
        .take(MAX_TOKENS)
        .map(|&id| id as i64)
        .collect();
    let len = ids.len();
    if len == 0 {
        return Ok(Vec::new());
    }

    let input_ids = ndarray::Array2::from_shape_vec((1, len), ids)
        .map_err(|e| anyhow!("Input ids shape: {}", e))?;
    let attention_mask = ndarray::Array2::from_elem((1, len), 1i64);
    let token_type_ids = ndarray::Array2::from_elem((1, len), 0i64);

    let input_ids: Tensor = input_ids.into();
    let attention_mask: Tensor = attention_mask.into();
    let token_type_ids: Tensor = token_type_ids.into();
    let result = (model.run)(tvec!(
        input_ids.into(),
        attention_mask.into(),
        token_type_ids.into()
    ))?;

    let output = result
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No output tensor"))?;
    let view = output
        .to_array_view::<f32>()
        .map_err(|e| anyhow!("Output to array: {}", e))?;

    // [1, seq_len, dims] for last_hidden_state, [1, dims] for a pooled head.
    let shape = view.shape().to_vec();
    match shape.as_slice() {
        [1, seq_len, _] => Ok((0..(*seq_len).min(len))
            .map(|j| view.slice(ndarray::s![0, j, ..]).iter().copied().collect())
            .collect()),
        [1, _] => Ok(vec![view.iter().copied().collect()]),
        _ => bail!("Unexpected output shape: {:?}", shape),
    }
}
