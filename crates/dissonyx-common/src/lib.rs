//! dissonyx-common: Shared types, errors, and traits used across all Dissonyx crates.

pub mod error;
pub mod entities;
pub mod capability;
pub mod text;

// Re-export commonly used types
pub use capability::{SentimentClassifier, TextEmbedder};
pub use entities::{
    Conflict, ConflictProgress, DivergenceResult, Paper, PaperRecord, SentimentDistribution,
    SimilarityPair, Topic,
};
pub use error::{ApiError, DissonyxError, Result};
pub use text::{safe_name, split_sentences};
