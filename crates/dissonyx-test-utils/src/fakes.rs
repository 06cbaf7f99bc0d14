use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dissonyx_common::{DissonyxError, Result, SentimentClassifier, SentimentDistribution, TextEmbedder};

const DEFAULT_DIM: usize = 512;

/// Bag-of-words embedder.
///
/// Each distinct lowercase word gets its own dimension on first sight, so the
/// cosine of two sentences is `shared words / (sqrt(|a|) * sqrt(|b|))` for
/// sentences without repeated words. Punctuation is ignored.
pub struct VocabularyEmbedder {
    dim: usize,
    vocabulary: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
}

impl VocabularyEmbedder {
    pub fn new() -> Self {
        Self::with_dimension(DEFAULT_DIM)
    }

    pub fn with_dimension(dim: usize) -> Self {
        Self {
            dim: dim.max(1),
            vocabulary: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed` invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str, vocabulary: &mut HashMap<String, usize>) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for word in words(text) {
            let next = vocabulary.len();
            let slot = *vocabulary.entry(word).or_insert(next) % self.dim;
            vector[slot] += 1.0;
        }
        vector
    }
}

impl Default for VocabularyEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextEmbedder for VocabularyEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vocabulary = self
            .vocabulary
            .lock()
            .map_err(|_| DissonyxError::Inference("vocabulary lock poisoned".to_string()))?;
        Ok(texts.iter().map(|t| self.vectorize(t, &mut vocabulary)).collect())
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Sentiment looked up by exact sentence text, falling back to a default.
pub struct TableSentiment {
    table: HashMap<String, SentimentDistribution>,
    fallback: SentimentDistribution,
}

impl TableSentiment {
    /// Unknown sentences classify as fully neutral.
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
            fallback: SentimentDistribution::new(0.0, 1.0, 0.0),
        }
    }

    pub fn with(mut self, sentence: &str, distribution: [f64; 3]) -> Self {
        self.table.insert(sentence.to_string(), SentimentDistribution::from_array(distribution));
        self
    }

    pub fn with_fallback(mut self, distribution: [f64; 3]) -> Self {
        self.fallback = SentimentDistribution::from_array(distribution);
        self
    }
}

impl Default for TableSentiment {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentClassifier for TableSentiment {
    async fn classify(&self, text: &str) -> Result<SentimentDistribution> {
        Ok(self.table.get(text).copied().unwrap_or(self.fallback))
    }
}

/// Lexicon classifier: a negation cue makes a sentence negative, anything
/// else is positive.
pub struct NegationSentiment;

impl NegationSentiment {
    pub const NEGATIVE: [f64; 3] = [0.85, 0.10, 0.05];
    pub const POSITIVE: [f64; 3] = [0.05, 0.15, 0.80];

    const CUES: [&'static str; 5] = ["not", "no", "never", "none", "cannot"];
}

#[async_trait]
impl SentimentClassifier for NegationSentiment {
    async fn classify(&self, text: &str) -> Result<SentimentDistribution> {
        let negated = words(text).any(|w| Self::CUES.contains(&w.as_str()));
        let p = if negated { Self::NEGATIVE } else { Self::POSITIVE };
        Ok(SentimentDistribution::from_array(p))
    }
}
