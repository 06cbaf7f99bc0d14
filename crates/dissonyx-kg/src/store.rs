//! In-memory typed store of topics, papers and conflicts, persisted as a
//! single JSON document.
//!
//! Maps are ordered by id so the persisted bytes, and therefore the content
//! hash, only depend on the store contents.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use dissonyx_common::{safe_name, Conflict, DissonyxError, Paper, PaperRecord, Result, Topic};

use crate::ontology::{paper_uri, topic_uri};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeStore {
    #[serde(default)]
    topics: BTreeMap<String, Topic>,
    #[serde(default)]
    papers: BTreeMap<String, Paper>,
    /// Keyed by [`Conflict::key`].
    #[serde(default)]
    conflicts: BTreeMap<String, Conflict>,
}

/// Entity counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub topics: usize,
    pub papers: usize,
    pub conflicts: usize,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from disk. A missing file is an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No store at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let bytes = std::fs::read(path)?;
        let store: Self = serde_json::from_slice(&bytes)
            .map_err(|e| DissonyxError::Store(format!("failed to parse {}: {}", path.display(), e)))?;
        debug!(
            topics = store.topics.len(),
            papers = store.papers.len(),
            conflicts = store.conflicts.len(),
            "Loaded store from {}",
            path.display()
        );
        Ok(store)
    }

    /// Write the store to disk, replacing any previous file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // write-then-rename so a crash never leaves a truncated store
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, self.to_bytes()?)?;
        std::fs::rename(&tmp, path)?;
        debug!("Saved store to {}", path.display());
        Ok(())
    }

    /// The exact bytes `save` writes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Lowercase hex SHA-256 of the serialised store.
    pub fn content_hash(&self) -> Result<String> {
        Ok(hex::encode(Sha256::digest(self.to_bytes()?)))
    }

    /// Create the topic if it does not exist yet. Returns its id.
    pub fn add_topic(&mut self, name: &str) -> String {
        let id = safe_name(name);
        self.topics.entry(id.clone()).or_insert_with(|| Topic {
            id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    /// Add a paper related to `topics`, creating topics lazily.
    ///
    /// Re-adding an existing paper only extends its topic set; the stored
    /// name and conclusion are kept.
    pub fn add_paper(&mut self, name: &str, topics: &[String], conclusion: &str) -> String {
        let topic_ids: Vec<String> = topics.iter().map(|t| self.add_topic(t)).collect();
        let id = safe_name(name);

        let paper = self.papers.entry(id.clone()).or_insert_with(|| Paper {
            id: id.clone(),
            name: name.to_string(),
            conclusion: conclusion.to_string(),
            topics: BTreeSet::new(),
            added_at: Utc::now(),
        });
        if paper.conclusion != conclusion {
            debug!(paper = %id, "Paper already stored, keeping original conclusion");
        }
        paper.topics.extend(topic_ids);
        id
    }

    /// Record a conflict. A conflict with the same key replaces the old one.
    pub fn add_conflict(&mut self, conflict: Conflict) {
        let key = conflict.key();
        if let Some(previous) = self.conflicts.insert(key.clone(), conflict) {
            warn!(
                key = %key,
                replaced_sentence1 = %previous.sentence1,
                replaced_sentence2 = %previous.sentence2,
                "Conflict key collision, earlier record replaced"
            );
        }
    }

    pub fn all_topics(&self) -> Vec<Topic> {
        self.topics.values().cloned().collect()
    }

    /// Papers related to `topic` (display name or id).
    pub fn papers_with_topic(&self, topic: &str) -> Vec<PaperRecord> {
        let topic_id = safe_name(topic);
        self.papers
            .values()
            .filter(|p| p.topics.contains(&topic_id))
            .map(|p| PaperRecord {
                uri: paper_uri(&p.id),
                name: p.name.clone(),
                conclusion: p.conclusion.clone(),
                topics: p.topics.iter().map(|t| topic_uri(t)).collect(),
            })
            .collect()
    }

    pub fn topic(&self, name: &str) -> Option<&Topic> {
        self.topics.get(&safe_name(name))
    }

    pub fn paper(&self, name: &str) -> Option<&Paper> {
        self.papers.get(&safe_name(name))
    }

    pub fn papers(&self) -> impl Iterator<Item = &Paper> {
        self.papers.values()
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.values()
    }

    /// Conflicts naming the paper on either side.
    pub fn conflicts_for_paper(&self, name: &str) -> Vec<&Conflict> {
        let id = safe_name(name);
        self.conflicts.values().filter(|c| c.involves(&id)).collect()
    }

    /// Ids of every paper in conflict with `name`. The relation is
    /// symmetric: a conflict recorded as (a, b) also makes a conflict with b.
    pub fn conflicting_papers(&self, name: &str) -> BTreeSet<String> {
        let id = safe_name(name);
        self.conflicts
            .values()
            .filter_map(|c| {
                if c.paper1 == id {
                    Some(c.paper2.clone())
                } else if c.paper2 == id {
                    Some(c.paper1.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            topics: self.topics.len(),
            papers: self.papers.len(),
            conflicts: self.conflicts.len(),
        }
    }
}
