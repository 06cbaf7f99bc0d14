use std::path::PathBuf;

use tempfile::TempDir;

/// A paper as a submitter would describe it.
#[derive(Debug, Clone)]
pub struct PaperFixture {
    pub name: &'static str,
    pub topics: Vec<String>,
    pub conclusion: &'static str,
}

impl PaperFixture {
    /// Claims the sky is blue.
    pub fn sky_a() -> Self {
        Self {
            name: "A",
            topics: vec!["x".to_string()],
            conclusion: "The sky is blue. Cats are mammals.",
        }
    }

    /// Denies it.
    pub fn sky_b() -> Self {
        Self {
            name: "B",
            topics: vec!["x".to_string()],
            conclusion: "The sky is not blue at all. Dogs are mammals too.",
        }
    }

    /// Shares topic "x" but says nothing either paper says.
    pub fn unrelated() -> Self {
        Self {
            name: "Quarterly Report",
            topics: vec!["x".to_string()],
            conclusion: "Revenue grew by four percent.",
        }
    }

    pub fn with_topics(mut self, topics: &[&str]) -> Self {
        self.topics = topics.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Scratch directory plus a store path inside it. Keep the `TempDir`
/// alive for as long as the path is used.
pub fn temp_store() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let path = dir.path().join("paper_conflict_ontology.json");
    (dir, path)
}
