//! Configuration for the model service.

use serde::{Deserialize, Serialize};

/// Configuration for the sentence embedder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Hugging Face model ID
    pub model_id: String,

    /// Maximum sequence length (default: 512)
    pub max_length: usize,

    /// Batch size for inference (default: 32)
    pub batch_size: usize,

    /// L2-normalize embeddings (default: true)
    pub normalize: bool,

    /// Pooling strategy (default: pooler output, SimCSE's sentence vector)
    pub pooling: super::PoolingStrategy,

    /// Use GPU if available (default: false)
    pub use_gpu: bool,

    /// Maximum cache size for embeddings (number of entries, 0 disables)
    pub cache_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: "princeton-nlp/sup-simcse-bert-base-uncased".to_string(),
            max_length: 512,
            batch_size: 32,
            normalize: true,
            pooling: super::PoolingStrategy::Pooler,
            use_gpu: false,
            cache_size: 10_000,
        }
    }
}

impl EmbeddingConfig {
    /// Use a custom model.
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Set batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set maximum sequence length.
    pub fn with_max_length(mut self, length: usize) -> Self {
        self.max_length = length;
        self
    }

    pub fn with_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }

    pub fn with_cache_size(mut self, entries: usize) -> Self {
        self.cache_size = entries;
        self
    }
}

/// Configuration for the sentiment classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    pub model_id: String,
    pub max_length: usize,
    pub use_gpu: bool,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            model_id: "cardiffnlp/twitter-roberta-base-sentiment-latest".to_string(),
            max_length: 512,
            use_gpu: false,
        }
    }
}

impl SentimentConfig {
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_max_length(mut self, length: usize) -> Self {
        self.max_length = length;
        self
    }

    pub fn with_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }
}
