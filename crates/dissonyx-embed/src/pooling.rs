//! Pooling strategies for turning token states into sentence vectors.

use candle_core::Tensor;
use candle_nn::{Linear, Module};
use serde::{Deserialize, Serialize};

/// How a sentence embedding is read off the encoder output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PoolingStrategy {
    /// BERT pooler output: [CLS] state through `pooler.dense` and tanh.
    /// SimCSE reads its sentence vectors here.
    #[default]
    Pooler,

    /// Raw first ([CLS]) token state.
    Cls,

    /// Mean over non-padding tokens.
    Mean,
}

impl PoolingStrategy {
    /// Apply pooling to token embeddings.
    ///
    /// `embeddings` is (batch, seq_len, hidden), `attention_mask` is
    /// (batch, seq_len) as F32. Returns (batch, hidden). `pooler` must be
    /// present for [`PoolingStrategy::Pooler`].
    pub fn apply(
        &self,
        embeddings: &Tensor,
        attention_mask: &Tensor,
        pooler: Option<&Linear>,
    ) -> candle_core::Result<Tensor> {
        match self {
            PoolingStrategy::Pooler => {
                let dense = pooler.ok_or_else(|| candle_core::Error::Msg("pooler weights not loaded".to_string()))?;
                dense.forward(&cls_pool(embeddings)?)?.tanh()
            }
            PoolingStrategy::Cls => cls_pool(embeddings),
            PoolingStrategy::Mean => mean_pool(embeddings, attention_mask),
        }
    }

    pub fn needs_pooler(&self) -> bool {
        matches!(self, PoolingStrategy::Pooler)
    }
}

/// Extract the first token of every sequence.
pub(crate) fn cls_pool(embeddings: &Tensor) -> candle_core::Result<Tensor> {
    embeddings.narrow(1, 0, 1)?.squeeze(1)
}

fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask_expanded = attention_mask
        .unsqueeze(2)?
        .expand(embeddings.shape())?;

    let summed = (embeddings * &mask_expanded)?.sum(1)?;

    // clamp keeps all-padding rows finite
    let counts = attention_mask
        .unsqueeze(2)?
        .sum(1)?
        .clamp(1e-9f32, f32::MAX)?;

    summed.broadcast_div(&counts)
}

/// L2 normalize each row.
pub fn l2_normalize(embeddings: &Tensor) -> candle_core::Result<Tensor> {
    let norms = embeddings.sqr()?.sum_keepdim(1)?.sqrt()?;
    let norms_clamped = norms.clamp(1e-9f32, f32::MAX)?;
    embeddings.broadcast_div(&norms_clamped)
}
