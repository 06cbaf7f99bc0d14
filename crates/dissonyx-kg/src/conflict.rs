//! Conflict detection between a submitted paper and the stored papers that
//! share one of its topics.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use dissonyx_common::{
    safe_name, split_sentences, Conflict, ConflictProgress, PaperRecord, Result, SentimentClassifier,
    TextEmbedder,
};

use crate::sentiment::SentimentDivergenceScorer;
use crate::similarity::SentenceSimilarityScorer;
use crate::store::KnowledgeStore;

/// A pair only counts as a conflict when its divergence is strictly above this.
pub const DEFAULT_DIVERGENCE_THRESHOLD: f64 = 1.0;

/// Conflicts found for one topic of a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicConflicts {
    pub topic: String,
    pub conflicts: Vec<Conflict>,
}

pub struct ConflictDetector {
    similarity: SentenceSimilarityScorer,
    sentiment: SentimentDivergenceScorer,
    divergence_threshold: f64,
}

impl ConflictDetector {
    pub fn new(embedder: Arc<dyn TextEmbedder>, classifier: Arc<dyn SentimentClassifier>) -> Self {
        Self {
            similarity: SentenceSimilarityScorer::new(embedder),
            sentiment: SentimentDivergenceScorer::new(classifier),
            divergence_threshold: DEFAULT_DIVERGENCE_THRESHOLD,
        }
    }

    pub fn with_thresholds(mut self, similarity: f64, divergence: f64) -> Self {
        self.similarity = self.similarity.with_threshold(similarity);
        self.divergence_threshold = divergence;
        self
    }

    /// Compare `conclusion` with every candidate paper, recording each
    /// conflict in `store` as it is found.
    ///
    /// `on_progress` is called once per candidate with every conflict found
    /// so far for this topic, or once with 100% when there are no candidates.
    #[instrument(skip_all, fields(paper = %paper_name, topic = %topic, candidates = candidates.len()))]
    pub async fn detect<F>(
        &self,
        store: &mut KnowledgeStore,
        paper_name: &str,
        topic: &str,
        conclusion: &str,
        candidates: &[PaperRecord],
        on_progress: &mut F,
    ) -> Result<Vec<Conflict>>
    where
        F: FnMut(ConflictProgress) + Send,
    {
        let paper_id = safe_name(paper_name);
        let base = split_sentences(conclusion);
        let mut conflicts: Vec<Conflict> = Vec::new();

        if candidates.is_empty() {
            debug!("{topic} - 100%");
            on_progress(ConflictProgress {
                conflicts: Vec::new(),
                topic: topic.to_string(),
                progress: 100,
            });
            info!("No conflict found between {paper_name} and other papers in {topic}");
            return Ok(conflicts);
        }

        let total = candidates.len();
        for (k, candidate) in candidates.iter().enumerate() {
            let other_id = safe_name(&candidate.name);
            let other = split_sentences(&candidate.conclusion);

            let pairs = self.similarity.find_similar(&base, &other).await?;
            let scored = self.sentiment.score_divergence(&pairs).await?;

            for result in scored {
                if result.divergence > self.divergence_threshold {
                    let conflict = Conflict {
                        sentence1: result.sentence1,
                        sentence2: result.sentence2,
                        similarity: result.similarity,
                        divergence: result.divergence,
                        paper1: paper_id.clone(),
                        paper2: other_id.clone(),
                    };
                    store.add_conflict(conflict.clone());
                    conflicts.push(conflict);
                }
            }

            let progress = progress_percent(k + 1, total);
            debug!("{topic} - {progress}%");
            on_progress(ConflictProgress {
                conflicts: conflicts.clone(),
                topic: topic.to_string(),
                progress,
            });
        }

        if conflicts.is_empty() {
            info!("No conflict found between {paper_name} and other papers in {topic}");
        } else {
            info!(
                "Found {} conflicts between {paper_name} and other papers in {topic}",
                conflicts.len()
            );
        }
        Ok(conflicts)
    }

    /// Run [`detect`](Self::detect) once per topic against the papers stored
    /// under it, excluding the submitted paper itself. Topics are processed
    /// independently and in the given order.
    pub async fn generate_conflicts<F>(
        &self,
        store: &mut KnowledgeStore,
        paper_name: &str,
        topics: &[String],
        conclusion: &str,
        mut on_progress: F,
    ) -> Result<Vec<TopicConflicts>>
    where
        F: FnMut(ConflictProgress) + Send,
    {
        let paper_id = safe_name(paper_name);
        let mut per_topic = Vec::with_capacity(topics.len());

        for topic in topics {
            let candidates: Vec<PaperRecord> = store
                .papers_with_topic(topic)
                .into_iter()
                .filter(|p| safe_name(&p.name) != paper_id)
                .collect();

            let conflicts = self
                .detect(store, paper_name, topic, conclusion, &candidates, &mut on_progress)
                .await?;
            per_topic.push(TopicConflicts {
                topic: topic.clone(),
                conflicts,
            });
        }

        Ok(per_topic)
    }
}

/// `round(done / total * 100)`, rounding halves away from zero. An empty
/// total counts as finished.
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (done as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}
