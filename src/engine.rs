//! Composition root: builds the record store and embedding adapter from
//! configuration and tears them down when a command finishes.

use anyhow::Result;
use tracing::debug;

use civic_match_core::store::memory::InMemoryRecordStore;
use civic_match_core::EmbeddingAdapter;

use crate::config::Config;
use crate::embedding::create_adapter;
use crate::seed::load_seed;

/// Everything a command needs to rank or explain.
#[derive(Debug)]
pub struct Engine {
    pub store: InMemoryRecordStore,
    pub adapter: EmbeddingAdapter,
}

impl Engine {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = load_seed(&config.data.seed_path)?;
        let adapter = create_adapter(&config.embedding).await?;
        debug!(
            model = adapter.model_name(),
            dims = adapter.dims(),
            records = store.len(),
            "engine ready"
        );
        Ok(Self { store, adapter })
    }

    /// Release the embedding model.
    pub async fn shutdown(self) -> Result<()> {
        self.adapter.shutdown().await
    }
}
