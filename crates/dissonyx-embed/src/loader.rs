//! Shared model loading: Hub download, config parsing, device selection,
//! encoder construction and batch tokenisation.
//!
//! Two encoder families are supported: BERT (SimCSE, BERT sentiment heads)
//! and RoBERTa (cardiffnlp sentiment). RoBERTa runs on candle's XLM-RoBERTa
//! implementation, which offsets position ids past `pad_token_id`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, HiddenAct, PositionEmbeddingType};
use candle_transformers::models::xlm_roberta::{Config as RobertaConfig, XLMRobertaModel};
use hf_hub::api::sync::{Api, ApiRepo};
use hf_hub::{Repo, RepoType};
use tokenizers::models::bpe::BPE;
use tokenizers::models::wordpiece::WordPieceBuilder;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::pre_tokenizers::byte_level::ByteLevel;
use tokenizers::processors::bert::BertProcessing;
use tokenizers::processors::roberta::RobertaProcessing;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::{EmbedError, Result};

/// Encoder family, from `model_type` in `config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Architecture {
    Bert,
    Roberta,
}

impl Architecture {
    pub fn from_config(json: &serde_json::Value) -> Self {
        match json.get("model_type").and_then(|v| v.as_str()) {
            Some("roberta") | Some("xlm-roberta") | Some("camembert") => Architecture::Roberta,
            _ => Architecture::Bert,
        }
    }
}

/// Everything needed to instantiate an encoder.
pub(crate) struct ModelFiles {
    pub architecture: Architecture,
    pub config: Config,
    pub raw_config: serde_json::Value,
    pub tokenizer: Tokenizer,
    pub weights: PathBuf,
}

impl ModelFiles {
    /// Token id used to pad batches.
    pub fn pad_id(&self) -> u32 {
        self.config.pad_token_id as u32
    }
}

/// Download config, tokenizer and weights for `model_id`.
/// The sync Hub API runs on the blocking pool.
pub(crate) async fn fetch(model_id: &str) -> Result<ModelFiles> {
    let model_id = model_id.to_string();
    tokio::task::spawn_blocking(move || fetch_blocking(&model_id))
        .await
        .map_err(|e| EmbedError::Download(e.to_string()))?
}

fn fetch_blocking(model_id: &str) -> Result<ModelFiles> {
    let api = Api::new().map_err(|e| EmbedError::Download(format!("API init: {}", e)))?;
    let api_repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

    info!("Downloading config.json for {}", model_id);
    let config_path = api_repo.get("config.json")
        .map_err(|e| EmbedError::Download(format!("config.json: {}", e)))?;
    let raw_config: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
    let architecture = Architecture::from_config(&raw_config);
    let config = bert_config(&raw_config);

    let tokenizer = fetch_tokenizer(&api_repo, architecture)?;

    let weights = api_repo.get("model.safetensors")
        .or_else(|_| api_repo.get("pytorch_model.bin"))
        .map_err(|e| EmbedError::Download(format!("model weights: {}", e)))?;
    debug!("Weights at: {:?}", weights);

    Ok(ModelFiles { architecture, config, raw_config, tokenizer, weights })
}

/// `tokenizer.json` when the repo has one, otherwise the family's legacy
/// files: `vocab.json` + `merges.txt` for RoBERTa, `vocab.txt` for BERT.
fn fetch_tokenizer(api_repo: &ApiRepo, architecture: Architecture) -> Result<Tokenizer> {
    if let Ok(tokenizer_path) = api_repo.get("tokenizer.json") {
        return Ok(Tokenizer::from_file(&tokenizer_path)?);
    }

    match architecture {
        Architecture::Roberta => {
            info!("tokenizer.json not found, building byte-level BPE from vocab.json + merges.txt");
            let vocab = api_repo.get("vocab.json")
                .map_err(|e| EmbedError::Download(format!("vocab.json: {}", e)))?;
            let merges = api_repo.get("merges.txt")
                .map_err(|e| EmbedError::Download(format!("merges.txt: {}", e)))?;
            bpe_from_files(&vocab, &merges)
        }
        Architecture::Bert => {
            info!("tokenizer.json not found, building WordPiece from vocab.txt");
            let vocab_path = api_repo.get("vocab.txt")
                .map_err(|e| EmbedError::Download(format!("vocab.txt: {}", e)))?;
            wordpiece_from_vocab(&vocab_path)
        }
    }
}

/// RoBERTa pipeline: byte-level BPE, `<s> ... </s>` framing.
fn bpe_from_files(vocab: &Path, merges: &Path) -> Result<Tokenizer> {
    let bpe = BPE::from_file(&vocab.to_string_lossy(), &merges.to_string_lossy())
        .build()
        .map_err(|e| EmbedError::Tokenizer(format!("BPE build: {}", e)))?;

    let mut tokenizer = Tokenizer::new(bpe);
    tokenizer.with_pre_tokenizer(ByteLevel::new(false, true, true));
    let cls = tokenizer.token_to_id("<s>").unwrap_or(0);
    let sep = tokenizer.token_to_id("</s>").unwrap_or(2);
    tokenizer.with_post_processor(
        RobertaProcessing::new(("</s>".to_string(), sep), ("<s>".to_string(), cls))
            .trim_offsets(true)
            .add_prefix_space(false),
    );
    Ok(tokenizer)
}

/// Uncased BERT pipeline over a plain `vocab.txt`: clean + lowercase,
/// punctuation-aware word splitting, `[CLS] ... [SEP]` framing.
fn wordpiece_from_vocab(path: &Path) -> Result<Tokenizer> {
    let vocab: HashMap<String, u32> = std::fs::read_to_string(path)?
        .lines()
        .enumerate()
        .map(|(i, line)| (line.to_string(), i as u32))
        .collect();
    let cls = vocab.get("[CLS]").copied().unwrap_or(101);
    let sep = vocab.get("[SEP]").copied().unwrap_or(102);

    let wordpiece = WordPieceBuilder::new()
        .vocab(vocab)
        .continuing_subword_prefix("##".to_string())
        .max_input_chars_per_word(100)
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| EmbedError::Tokenizer(format!("WordPiece build: {}", e)))?;

    let mut tokenizer = Tokenizer::new(wordpiece);
    tokenizer.with_normalizer(BertNormalizer::new(true, true, None, true));
    tokenizer.with_pre_tokenizer(BertPreTokenizer);
    tokenizer.with_post_processor(BertProcessing::new(("[SEP]".to_string(), sep), ("[CLS]".to_string(), cls)));
    Ok(tokenizer)
}

/// Build a candle BERT config from a Hub `config.json`, defaulting every
/// missing field to bert-base values.
pub(crate) fn bert_config(json: &serde_json::Value) -> Config {
    let usize_or = |key: &str, default: usize| {
        json.get(key).and_then(|v| v.as_u64()).map(|v| v as usize).unwrap_or(default)
    };
    let f64_or = |key: &str, default: f64| json.get(key).and_then(|v| v.as_f64()).unwrap_or(default);

    let hidden_act = match json.get("hidden_act").and_then(|v| v.as_str()) {
        Some("relu") => HiddenAct::Relu,
        Some("gelu_new") | Some("gelu_approximate") => HiddenAct::GeluApproximate,
        _ => HiddenAct::Gelu,
    };

    Config {
        vocab_size: usize_or("vocab_size", 30522),
        hidden_size: usize_or("hidden_size", 768),
        num_hidden_layers: usize_or("num_hidden_layers", 12),
        num_attention_heads: usize_or("num_attention_heads", 12),
        intermediate_size: usize_or("intermediate_size", 3072),
        hidden_act,
        hidden_dropout_prob: f64_or("hidden_dropout_prob", 0.1),
        max_position_embeddings: usize_or("max_position_embeddings", 512),
        type_vocab_size: usize_or("type_vocab_size", 2),
        initializer_range: f64_or("initializer_range", 0.02),
        layer_norm_eps: f64_or("layer_norm_eps", 1e-12),
        pad_token_id: usize_or("pad_token_id", 0),
        position_embedding_type: PositionEmbeddingType::Absolute,
        use_cache: true,
        classifier_dropout: None,
        model_type: json.get("model_type").and_then(|v| v.as_str()).map(str::to_string),
    }
}

/// Build a candle XLM-RoBERTa config from a Hub `config.json`, filling the
/// fields older RoBERTa configs omit with roberta-base values.
pub(crate) fn roberta_config(json: &serde_json::Value) -> Result<RobertaConfig> {
    let mut merged = serde_json::json!({
        "hidden_size": 768,
        "layer_norm_eps": 1e-5,
        "attention_probs_dropout_prob": 0.1,
        "hidden_dropout_prob": 0.1,
        "num_attention_heads": 12,
        "position_embedding_type": "absolute",
        "intermediate_size": 3072,
        "hidden_act": "gelu",
        "num_hidden_layers": 12,
        "vocab_size": 50265,
        "max_position_embeddings": 514,
        "type_vocab_size": 1,
        "pad_token_id": 1
    });
    if let (Some(target), Some(source)) = (merged.as_object_mut(), json.as_object()) {
        for (key, value) in source {
            if target.contains_key(key) {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    serde_json::from_value(merged).map_err(|e| EmbedError::ModelLoad(format!("RoBERTa config: {}", e)))
}

pub(crate) fn select_device(use_gpu: bool) -> Device {
    if !use_gpu {
        return Device::Cpu;
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("CUDA device available");
                return device;
            }
            Err(e) => debug!("CUDA not available: {}, falling back to CPU", e),
        }
    }

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Metal device available");
                return device;
            }
            Err(e) => debug!("Metal not available: {}, falling back to CPU", e),
        }
    }

    Device::Cpu
}

pub(crate) fn var_builder(weights: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let is_safetensors = weights.extension().map(|e| e == "safetensors").unwrap_or(false);
    let vb = if is_safetensors {
        // SAFETY: the Hub cache file is not modified while mapped.
        unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, device)? }
    } else {
        VarBuilder::from_pth(weights, DType::F32, device)?
    };
    Ok(vb)
}

/// A loaded encoder producing (batch, seq_len, hidden) token states.
pub(crate) enum Encoder {
    Bert(BertModel),
    Roberta(XLMRobertaModel),
}

impl Encoder {
    /// Load the encoder, trying the bare layout first and then the
    /// `bert.` / `roberta.` prefix used by classification checkpoints.
    pub fn load(vb: &VarBuilder<'static>, files: &ModelFiles) -> Result<Self> {
        match files.architecture {
            Architecture::Bert => BertModel::load(vb.clone(), &files.config)
                .or_else(|_| BertModel::load(vb.pp("bert"), &files.config))
                .map(Encoder::Bert)
                .map_err(|e| EmbedError::ModelLoad(format!("BertModel: {}", e))),
            Architecture::Roberta => {
                let config = roberta_config(&files.raw_config)?;
                XLMRobertaModel::new(&config, vb.pp("roberta"))
                    .or_else(|_| XLMRobertaModel::new(&config, vb.clone()))
                    .map(Encoder::Roberta)
                    .map_err(|e| EmbedError::ModelLoad(format!("XLMRobertaModel: {}", e)))
            }
        }
    }

    pub fn forward(&self, batch: &EncodedBatch) -> Result<Tensor> {
        let hidden = match self {
            Encoder::Bert(model) => {
                model.forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))?
            }
            Encoder::Roberta(model) => model.forward(
                &batch.input_ids,
                &batch.attention_mask,
                &batch.token_type_ids,
                None,
                None,
                None,
            )?,
        };
        Ok(hidden)
    }
}

/// Encoded, padded batch ready for [`Encoder::forward`].
pub(crate) struct EncodedBatch {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    /// F32 so it can be multiplied into hidden states.
    pub attention_mask: Tensor,
}

/// Tokenise `texts`, truncate to `max_length` and right-pad with `pad_id`.
pub(crate) fn encode_batch(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_length: usize,
    pad_id: u32,
    device: &Device,
) -> Result<EncodedBatch> {
    let text_refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
    let encodings = tokenizer.encode_batch(text_refs, true)?;

    let limit = max_length.clamp(1, 512);
    let mut ids_rows = Vec::with_capacity(texts.len());
    let mut mask_rows = Vec::with_capacity(texts.len());
    let mut type_rows = Vec::with_capacity(texts.len());

    for encoding in &encodings {
        let len = encoding.get_ids().len().min(limit);
        ids_rows.push(encoding.get_ids()[..len].to_vec());
        mask_rows.push(encoding.get_attention_mask()[..len].to_vec());
        type_rows.push(encoding.get_type_ids()[..len].to_vec());
    }

    let seq_len = ids_rows.iter().map(|v| v.len()).max().unwrap_or(0);
    if seq_len == 0 {
        return Err(EmbedError::InvalidInput("tokenizer produced no tokens".to_string()));
    }

    for ((ids, mask), type_ids) in ids_rows.iter_mut().zip(mask_rows.iter_mut()).zip(type_rows.iter_mut()) {
        let pad = seq_len - ids.len();
        ids.extend(std::iter::repeat_n(pad_id, pad));
        mask.extend(std::iter::repeat_n(0, pad));
        type_ids.extend(std::iter::repeat_n(0, pad));
    }

    let batch = texts.len();
    Ok(EncodedBatch {
        input_ids: Tensor::new(ids_rows, device)?.reshape((batch, seq_len))?,
        token_type_ids: Tensor::new(type_rows, device)?.reshape((batch, seq_len))?,
        attention_mask: Tensor::new(mask_rows, device)?
            .reshape((batch, seq_len))?
            .to_dtype(DType::F32)?,
    })
}
