//! BERT sentence embedder using Candle.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use candle_core::Device;
use candle_nn::{Linear, VarBuilder};
use lru::LruCache;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use dissonyx_common::TextEmbedder;

use crate::loader::{self, encode_batch, Encoder};
use crate::pooling::l2_normalize;
use crate::{EmbedError, EmbeddingConfig, Result};

/// Sentence embedder over a BERT-family encoder.
///
/// Loads the model from Hugging Face Hub and provides batched inference.
/// Embeddings are memoised per sentence text when `cache_size > 0`.
pub struct SentenceEmbedder {
    model: Encoder,
    /// `pooler.dense`, loaded only for [`PoolingStrategy::Pooler`](crate::PoolingStrategy::Pooler).
    pooler: Option<Linear>,
    tokenizer: Tokenizer,
    pad_id: u32,
    device: Device,
    config: EmbeddingConfig,
    hidden_size: usize,
    cache: Option<Arc<Mutex<LruCache<String, Vec<f32>>>>>,
}

impl SentenceEmbedder {
    pub async fn new(config: EmbeddingConfig) -> Result<Self> {
        let start = Instant::now();
        info!("Loading sentence embedding model: {}", config.model_id);

        let device = loader::select_device(config.use_gpu);
        debug!("Using device: {:?}", device);

        let files = loader::fetch(&config.model_id).await?;
        let vb = loader::var_builder(&files.weights, &device)?;
        let model = Encoder::load(&vb, &files)?;
        let pooler = if config.pooling.needs_pooler() {
            Some(load_pooler(&vb, files.config.hidden_size)?)
        } else {
            None
        };
        info!("Embedding model loaded in {:.2}s", start.elapsed().as_secs_f32());

        let cache = NonZeroUsize::new(config.cache_size)
            .map(|size| Arc::new(Mutex::new(LruCache::new(size))));

        Ok(Self {
            model,
            pooler,
            pad_id: files.pad_id(),
            tokenizer: files.tokenizer,
            device,
            hidden_size: files.config.hidden_size,
            config,
            cache,
        })
    }

    /// Embed a list of texts, returning vectors in input order.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let mut slots: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut pending: Vec<usize> = Vec::new();

        match &self.cache {
            Some(cache) => {
                let mut guard = cache.lock().map_err(|_| EmbedError::CachePoisoned)?;
                for (i, text) in texts.iter().enumerate() {
                    match guard.get(text) {
                        Some(hit) => slots[i] = Some(hit.clone()),
                        None => pending.push(i),
                    }
                }
            }
            None => pending.extend(0..texts.len()),
        }

        for chunk in pending.chunks(self.config.batch_size.max(1)) {
            let batch: Vec<String> = chunk.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.embed_batch(&batch)?;

            if let Some(cache) = &self.cache {
                let mut guard = cache.lock().map_err(|_| EmbedError::CachePoisoned)?;
                for (text, vector) in batch.iter().zip(vectors.iter()) {
                    guard.put(text.clone(), vector.clone());
                }
            }

            for (&i, vector) in chunk.iter().zip(vectors) {
                slots[i] = Some(vector);
            }
        }

        let embeddings = slots
            .into_iter()
            .map(|slot| slot.ok_or_else(|| EmbedError::Inference("missing embedding in batch output".to_string())))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Embedded {} texts ({} uncached) in {:.2}ms",
            texts.len(),
            pending.len(),
            start.elapsed().as_secs_f32() * 1000.0
        );

        Ok(embeddings)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encoded = encode_batch(&self.tokenizer, texts, self.config.max_length, self.pad_id, &self.device)?;

        let hidden = self.model.forward(&encoded)?;
        let pooled = self.config.pooling.apply(&hidden, &encoded.attention_mask, self.pooler.as_ref())?;
        let pooled = if self.config.normalize { l2_normalize(&pooled)? } else { pooled };

        Ok(pooled.to_vec2::<f32>()?)
    }

    /// Embedding dimension (hidden size of the encoder).
    pub fn dimension(&self) -> usize {
        self.hidden_size
    }

    pub fn model_name(&self) -> &str {
        &self.config.model_id
    }

    pub fn is_gpu(&self) -> bool {
        matches!(self.device, Device::Cuda(_) | Device::Metal(_))
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            if let Ok(mut guard) = cache.lock() {
                guard.clear();
            }
        }
    }
}

/// `pooler.dense` of a bare or `bert.`-prefixed checkpoint.
pub(crate) fn load_pooler(vb: &VarBuilder<'static>, hidden: usize) -> Result<Linear> {
    candle_nn::linear(hidden, hidden, vb.pp("pooler").pp("dense"))
        .or_else(|_| candle_nn::linear(hidden, hidden, vb.pp("bert").pp("pooler").pp("dense")))
        .map_err(|e| EmbedError::ModelLoad(format!("pooler: {}", e)))
}

#[async_trait]
impl TextEmbedder for SentenceEmbedder {
    async fn embed(&self, texts: &[String]) -> dissonyx_common::Result<Vec<Vec<f32>>> {
        Ok(self.embed_texts(texts).await?)
    }
}
