//! Submission orchestrator.
//!
//! Steps for one submission:
//!   1. Validate the submission
//!   2. Load the store (missing file = empty store)
//!   3. Add the paper and save
//!   4. Emit `paper_added`
//!   5. Detect conflicts topic by topic against the stored conclusion,
//!      emitting a `conflict` event per processed candidate
//!   6. Save again and emit the `graph_hash` of the saved store
//!
//! Any failure, including the submission timeout, is reported as a single
//! `error` event and ends the submission.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use dissonyx_common::{DissonyxError, Result};
use dissonyx_kg::{ConflictDetector, KnowledgeStore};

use crate::events::{Submission, SubmissionEvent};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

pub struct IngestionService {
    store_path: PathBuf,
    detector: Arc<ConflictDetector>,
    timeout: Duration,
    /// Held for the whole load → save → detect → save cycle so concurrent
    /// submissions never overwrite each other's store.
    writer: Mutex<()>,
}

impl IngestionService {
    pub fn new(store_path: impl Into<PathBuf>, detector: Arc<ConflictDetector>) -> Self {
        Self {
            store_path: store_path.into(),
            detector,
            timeout: DEFAULT_TIMEOUT,
            writer: Mutex::new(()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Current persisted store. Saves are atomic renames, so this never sees
    /// a half-written file.
    pub async fn snapshot(&self) -> Result<KnowledgeStore> {
        KnowledgeStore::load(&self.store_path)
    }

    /// Process one submission, streaming its events to `events`.
    ///
    /// Returns the final graph hash. On failure the error has already been
    /// sent as an `error` event.
    #[instrument(
        skip_all,
        fields(submission_id = %Uuid::new_v4(), title = %submission.title, topics = submission.topics.len())
    )]
    pub async fn submit(&self, submission: Submission, events: UnboundedSender<SubmissionEvent>) -> Result<String> {
        let outcome = match tokio::time::timeout(self.timeout, self.run(&submission, &events)).await {
            Ok(result) => result,
            Err(_) => Err(DissonyxError::Timeout(self.timeout.as_secs())),
        };

        if let Err(e) = &outcome {
            warn!(error = %e, "Submission failed");
            let _ = events.send(SubmissionEvent::error(e.to_string()));
        }
        outcome
    }

    async fn run(&self, submission: &Submission, events: &UnboundedSender<SubmissionEvent>) -> Result<String> {
        submission.validate()?;

        let _writer = self.writer.lock().await;
        let t0 = std::time::Instant::now();

        let mut store = KnowledgeStore::load(&self.store_path)?;
        let paper_id = store.add_paper(&submission.title, &submission.topics, &submission.text);
        store.save(&self.store_path)?;
        info!(paper = %paper_id, "Paper added");
        let _ = events.send(SubmissionEvent::paper_added());

        // a resubmitted paper keeps its first conclusion, so compare that one
        let conclusion = store
            .paper(&paper_id)
            .map(|p| p.conclusion.clone())
            .ok_or_else(|| DissonyxError::Store(format!("paper {paper_id} missing after save")))?;

        let per_topic = self
            .detector
            .generate_conflicts(&mut store, &submission.title, &submission.topics, &conclusion, |progress| {
                let _ = events.send(SubmissionEvent::Conflict(progress));
            })
            .await?;

        store.save(&self.store_path)?;
        let graph_hash = store.content_hash()?;

        let found: usize = per_topic.iter().map(|t| t.conflicts.len()).sum();
        info!(
            paper = %paper_id,
            conflicts = found,
            graph_hash = %graph_hash,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Submission complete"
        );
        let _ = events.send(SubmissionEvent::GraphHash { graph_hash: graph_hash.clone() });
        Ok(graph_hash)
    }
}
