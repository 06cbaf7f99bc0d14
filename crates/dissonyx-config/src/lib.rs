//! Configuration loading for Dissonyx.
//! Reads dissonyx.toml from the current directory or the path in the DISSONYX_CONFIG env var.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub models: ModelConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16    { 5000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String { "paper_conflict_ontology.json".to_string() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_sentiment_model")]
    pub sentiment_model: String,
    #[serde(default)]
    pub use_gpu: bool,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_embedding_model() -> String { "princeton-nlp/sup-simcse-bert-base-uncased".to_string() }
fn default_sentiment_model() -> String { "cardiffnlp/twitter-roberta-base-sentiment-latest".to_string() }
fn default_max_length()      -> usize  { 512 }
fn default_batch_size()      -> usize  { 32 }
fn default_cache_size()      -> usize  { 10_000 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_model: default_embedding_model(),
            sentiment_model: default_sentiment_model(),
            use_gpu: false,
            max_length: default_max_length(),
            batch_size: default_batch_size(),
            cache_size: default_cache_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_divergence_threshold")]
    pub divergence_threshold: f64,
}

fn default_similarity_threshold() -> f64 { 0.5 }
fn default_divergence_threshold() -> f64 { 1.0 }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            divergence_threshold: default_divergence_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 300 }

impl Default for IngestionConfig {
    fn default() -> Self {
        Self { timeout_secs: default_timeout_secs() }
    }
}

impl IngestionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}


impl Config {
    /// Load configuration from dissonyx.toml.
    /// Checks DISSONYX_CONFIG env var first, then current directory.
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("DISSONYX_CONFIG")
            .unwrap_or_else(|_| "dissonyx.toml".to_string());

        if !Path::new(&path).exists() {
            tracing::warn!(
                "Config file not found: {} (copy dissonyx.example.toml to dissonyx.toml to customise); using defaults",
                path
            );
            return Ok(Self::default());
        }

        Self::from_path(&path)
    }

    /// Parse configuration from a specific TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.detection.similarity_threshold) {
            anyhow::bail!(
                "detection.similarity_threshold must be within [0, 1], got {}",
                self.detection.similarity_threshold
            );
        }
        if self.detection.divergence_threshold < 0.0 {
            anyhow::bail!(
                "detection.divergence_threshold must be non-negative, got {}",
                self.detection.divergence_threshold
            );
        }
        if self.ingestion.timeout_secs == 0 {
            anyhow::bail!("ingestion.timeout_secs must be greater than zero");
        }
        Ok(())
    }
}
