//! TOML configuration for the `cmatch` binary.
//!
//! ```toml
//! [data]
//! seed_path = "data/seed.json"
//!
//! [ranking]
//! default_limit = 10
//! concurrency = 8
//!
//! [embedding]
//! provider = "hashing"   # hashing | openai | ollama | local
//! dims = 256
//!
//! [logging]
//! level = "warn"
//! ```
//!
//! Every section except `[data]` is optional. [`load_config`] rejects
//! values the engine cannot run with.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use civic_match_core::rank::{DEFAULT_CONCURRENCY, DEFAULT_LIMIT};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub data: DataConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    pub seed_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}
fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Base URL for the `ollama` provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: default_dims(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "hashing".to_string()
}
fn default_dims() -> usize {
    256
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Configuration used when no config file exists: offline hashing
    /// embeddings over `data/seed.json`.
    pub fn minimal() -> Self {
        Self {
            data: DataConfig {
                seed_path: PathBuf::from("data/seed.json"),
            },
            ranking: RankingConfig::default(),
            embedding: EmbeddingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Resolve `seed_path` against the directory the config was read from.
    pub fn resolve_paths(mut self, config_path: &Path) -> Self {
        if self.data.seed_path.is_relative() {
            if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
                let candidate = dir.join(&self.data.seed_path);
                if candidate.exists() {
                    self.data.seed_path = candidate;
                }
            }
        }
        self
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config.resolve_paths(path))
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.ranking.default_limit == 0 {
        anyhow::bail!("ranking.default_limit must be >= 1");
    }
    if config.ranking.concurrency == 0 {
        anyhow::bail!("ranking.concurrency must be >= 1");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    match config.embedding.provider.as_str() {
        "hashing" => {}
        "openai" | "ollama" | "local" => {
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be hashing, openai, ollama, or local.",
            other
        ),
    }

    Ok(())
}
