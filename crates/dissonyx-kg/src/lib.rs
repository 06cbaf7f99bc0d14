//! dissonyx-kg: Paper/topic/conflict knowledge store and the conflict
//! detection pipeline that feeds it.
//!
//! Flow for one submitted paper and topic:
//! conclusion → sentences → [`SentenceSimilarityScorer`] →
//! [`SentimentDivergenceScorer`] → [`ConflictDetector`] → [`KnowledgeStore`].

pub mod store;
pub mod ontology;
pub mod similarity;
pub mod sentiment;
pub mod conflict;

pub use conflict::{progress_percent, ConflictDetector, TopicConflicts};
pub use sentiment::{divergence, SentimentDivergenceScorer};
pub use similarity::{cosine_similarity, SentenceSimilarityScorer};
pub use store::{KnowledgeStore, StoreStats};
