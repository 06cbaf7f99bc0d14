//! Dissonyx Model Service
//!
//! Pure Rust sentence embeddings and sentiment classification using Candle
//! (Hugging Face). Models are pulled from the Hugging Face Hub on first use.
//!
//! # Features
//! - BERT sentence embeddings (SimCSE by default) with an LRU cache
//! - Three-class sentiment classification (negative / neutral / positive)
//! - GPU support (CUDA, Metal) with automatic fallback to CPU
//! - Both models implement the `dissonyx-common` capability traits, so they
//!   plug straight into the conflict scorers
//!
//! # Example
//! ```rust,no_run
//! use dissonyx_embed::{SentenceEmbedder, EmbeddingConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let embedder = SentenceEmbedder::new(EmbeddingConfig::default()).await?;
//!
//!     let texts = vec![
//!         "The sky is blue.".to_string(),
//!         "The sky is not blue at all.".to_string(),
//!     ];
//!
//!     let embeddings = embedder.embed_texts(&texts).await?;
//!     println!("Embedding dimension: {}", embeddings[0].len());
//!
//!     Ok(())
//! }
//! ```

pub mod embedder;
pub mod sentiment;
pub mod config;
pub mod pooling;
pub mod error;
mod loader;

pub use embedder::SentenceEmbedder;
pub use sentiment::SentimentModel;
pub use config::{EmbeddingConfig, SentimentConfig};
pub use error::{EmbedError, Result};
pub use pooling::PoolingStrategy;
