//! Deterministic stand-ins for the model capabilities, plus paper fixtures.
//!
//! Nothing here downloads a model: tests across the workspace run the real
//! scorers and detector against these fakes.

pub mod fakes;
pub mod fixtures;

pub use fakes::{NegationSentiment, TableSentiment, VocabularyEmbedder};
pub use fixtures::{temp_store, PaperFixture};
