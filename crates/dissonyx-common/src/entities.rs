/// Core entity types mirroring the paper-conflict graph schema.
/// Persisted entities (Topic, Paper, Conflict) plus the transient records
/// passed between the scorers.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Normalised name (see [`crate::text::safe_name`]).
    pub id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Paper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Normalised name (see [`crate::text::safe_name`]).
    pub id: String,
    pub name: String,
    pub conclusion: String,
    /// Topic ids this paper is related to.
    pub topics: BTreeSet<String>,
    pub added_at: DateTime<Utc>,
}

/// A paper as returned by topic queries against the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub uri: String,
    pub name: String,
    pub conclusion: String,
    pub topics: Vec<String>,
}

// ---------------------------------------------------------------------------
// Conflict
// ---------------------------------------------------------------------------

/// A pair of sentences from two papers that talk about the same thing with
/// opposing sentiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub sentence1: String,
    pub sentence2: String,
    /// Cosine similarity of the two sentences (stored as `has_distance_score`).
    pub similarity: f64,
    /// Sentiment divergence (stored as `has_conflict_score`).
    pub divergence: f64,
    /// Normalised id of the submitted paper.
    pub paper1: String,
    /// Normalised id of the stored paper it was compared with.
    pub paper2: String,
}

impl Conflict {
    /// Composite identity `{paper1}-{paper2}-{divergence}`.
    ///
    /// Not unique: two sentence pairs between the same papers with exactly
    /// the same score share a key.
    pub fn key(&self) -> String {
        format!("{}-{}-{}", self.paper1, self.paper2, self.divergence)
    }

    /// Whether this conflict relates the given paper id on either side.
    pub fn involves(&self, paper_id: &str) -> bool {
        self.paper1 == paper_id || self.paper2 == paper_id
    }
}

// ---------------------------------------------------------------------------
// Scoring records
// ---------------------------------------------------------------------------

/// A cross-paper sentence pair whose embeddings are similar enough to compare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityPair {
    pub sentence1: String,
    pub index1: usize,
    pub sentence2: String,
    pub index2: usize,
    pub similarity: f64,
}

/// Three-class sentiment probabilities in the fixed order
/// negative, neutral, positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
}

impl SentimentDistribution {
    pub fn new(negative: f64, neutral: f64, positive: f64) -> Self {
        Self { negative, neutral, positive }
    }

    pub fn from_array(p: [f64; 3]) -> Self {
        Self::new(p[0], p[1], p[2])
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.negative, self.neutral, self.positive]
    }

    /// Sum of absolute per-class differences. Lies in [0, 2] for proper
    /// distributions.
    pub fn l1_distance(&self, other: &SentimentDistribution) -> f64 {
        self.as_array()
            .iter()
            .zip(other.as_array().iter())
            .map(|(a, b)| (a - b).abs())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceResult {
    pub sentence1: String,
    pub sentence2: String,
    pub sentiment1: SentimentDistribution,
    pub sentiment2: SentimentDistribution,
    /// Similarity of the originating pair.
    pub similarity: f64,
    pub divergence: f64,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress report emitted after each candidate paper of a topic is processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictProgress {
    /// Every conflict found for the topic so far.
    pub conflicts: Vec<Conflict>,
    pub topic: String,
    /// Percentage of candidate papers processed, 0–100.
    pub progress: u8,
}
