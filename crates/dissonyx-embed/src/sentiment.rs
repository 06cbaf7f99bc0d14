//! Three-class sentiment classifier over a BERT or RoBERTa encoder.
//!
//! Supports the two common sequence-classification heads:
//! - RoBERTa: `classifier.dense` → tanh → `classifier.out_proj` on the first token
//! - BERT: `bert.pooler.dense` → tanh → `classifier` on the first token

use std::time::Instant;

use async_trait::async_trait;
use candle_core::{Device, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use dissonyx_common::{SentimentClassifier, SentimentDistribution};

use crate::embedder::load_pooler;
use crate::loader::{self, encode_batch, Encoder};
use crate::pooling::cls_pool;
use crate::{EmbedError, Result, SentimentConfig};

enum ClassifierHead {
    Roberta { dense: Linear, out_proj: Linear },
    Bert { pooler: Linear, classifier: Linear },
}

impl ClassifierHead {
    fn load(vb: &VarBuilder<'static>, hidden: usize, num_labels: usize) -> Result<Self> {
        let roberta = vb.pp("classifier");
        if let (Ok(dense), Ok(out_proj)) = (
            candle_nn::linear(hidden, hidden, roberta.pp("dense")),
            candle_nn::linear(hidden, num_labels, roberta.pp("out_proj")),
        ) {
            return Ok(ClassifierHead::Roberta { dense, out_proj });
        }

        let pooler = load_pooler(vb, hidden)?;
        let classifier = candle_nn::linear(hidden, num_labels, vb.pp("classifier"))
            .map_err(|e| EmbedError::ModelLoad(format!("classifier: {}", e)))?;
        Ok(ClassifierHead::Bert { pooler, classifier })
    }

    fn logits(&self, first_token: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            ClassifierHead::Roberta { dense, out_proj } => out_proj.forward(&dense.forward(first_token)?.tanh()?),
            ClassifierHead::Bert { pooler, classifier } => classifier.forward(&pooler.forward(first_token)?.tanh()?),
        }
    }
}

/// Sentiment model wrapper.
pub struct SentimentModel {
    model: Encoder,
    head: ClassifierHead,
    tokenizer: Tokenizer,
    pad_id: u32,
    device: Device,
    /// Output index of the negative, neutral and positive classes.
    label_order: [usize; 3],
    config: SentimentConfig,
}

impl SentimentModel {
    pub async fn new(config: SentimentConfig) -> Result<Self> {
        let start = Instant::now();
        info!("Loading sentiment model: {}", config.model_id);

        let device = loader::select_device(config.use_gpu);
        let files = loader::fetch(&config.model_id).await?;
        let label_order = label_order(&files.raw_config)?;

        let vb = loader::var_builder(&files.weights, &device)?;
        let model = Encoder::load(&vb, &files)?;
        let head = ClassifierHead::load(&vb, files.config.hidden_size, 3)?;

        info!("Sentiment model loaded in {:?}", start.elapsed());

        Ok(Self {
            model,
            head,
            pad_id: files.pad_id(),
            tokenizer: files.tokenizer,
            device,
            label_order,
            config,
        })
    }

    /// Class probabilities for a single text.
    pub fn predict(&self, text: &str) -> Result<SentimentDistribution> {
        let encoded = encode_batch(
            &self.tokenizer,
            &[text.to_string()],
            self.config.max_length,
            self.pad_id,
            &self.device,
        )?;
        let hidden = self.model.forward(&encoded)?;

        let logits = self.head.logits(&cls_pool(&hidden)?)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?.to_vec2::<f32>()?;
        let row = probs
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Inference("classifier produced no output".to_string()))?;

        let [neg, neu, pos] = self.label_order;
        let distribution = SentimentDistribution::new(row[neg] as f64, row[neu] as f64, row[pos] as f64);
        debug!(?distribution, "classified sentence");
        Ok(distribution)
    }

    pub fn model_name(&self) -> &str {
        &self.config.model_id
    }
}

#[async_trait]
impl SentimentClassifier for SentimentModel {
    async fn classify(&self, text: &str) -> dissonyx_common::Result<SentimentDistribution> {
        Ok(self.predict(text)?)
    }
}

/// Resolve which output index holds each class from `id2label`.
/// Generic labels (`LABEL_0`…) fall back to index order.
fn label_order(config: &serde_json::Value) -> Result<[usize; 3]> {
    let Some(labels) = config.get("id2label").and_then(|v| v.as_object()) else {
        return Ok([0, 1, 2]);
    };
    if labels.len() != 3 {
        return Err(EmbedError::ModelLoad(format!(
            "expected a 3-class sentiment model, found {} labels",
            labels.len()
        )));
    }

    let find = |prefix: &str| {
        labels.iter().find_map(|(idx, label)| {
            let label = label.as_str()?.to_lowercase();
            label.starts_with(prefix).then(|| idx.parse::<usize>().ok()).flatten()
        })
    };

    match (find("neg"), find("neu"), find("pos")) {
        (Some(neg), Some(neu), Some(pos)) if neg < 3 && neu < 3 && pos < 3 => Ok([neg, neu, pos]),
        _ => Ok([0, 1, 2]),
    }
}
