//! Model capabilities consumed by the scorers.
//!
//! The conflict pipeline never talks to a model directly; it is handed an
//! embedder and a sentiment classifier behind these traits. `dissonyx-embed`
//! provides the candle-backed implementations, `dissonyx-test-utils` the
//! deterministic ones used in tests.

use async_trait::async_trait;

use crate::entities::SentimentDistribution;
use crate::error::Result;

/// Produces one fixed-size vector per input text.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed `texts`, returning vectors in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Produces a negative/neutral/positive probability distribution for a text.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<SentimentDistribution>;
}
