//! Cross-list sentence similarity over injected embeddings.

use std::sync::Arc;

use tracing::debug;

use dissonyx_common::{DissonyxError, Result, SimilarityPair, TextEmbedder};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;

pub struct SentenceSimilarityScorer {
    embedder: Arc<dyn TextEmbedder>,
    threshold: f64,
}

impl SentenceSimilarityScorer {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            embedder,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Every (i, j) pair across the two lists whose cosine similarity is at
    /// least the threshold, ordered by i then j. Indices refer to the input
    /// lists; blank sentences are never paired.
    pub async fn find_similar(&self, first: &[String], second: &[String]) -> Result<Vec<SimilarityPair>> {
        let first = non_blank(first);
        let second = non_blank(second);
        if first.is_empty() || second.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = first
            .iter()
            .chain(second.iter())
            .map(|(_, s)| s.to_string())
            .collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(DissonyxError::Inference(format!(
                "embedder returned {} vectors for {} sentences",
                vectors.len(),
                texts.len()
            )));
        }
        let (first_vecs, second_vecs) = vectors.split_at(first.len());

        let mut pairs = Vec::new();
        for ((i, s1), v1) in first.iter().zip(first_vecs) {
            for ((j, s2), v2) in second.iter().zip(second_vecs) {
                let Some(similarity) = cosine_similarity(v1, v2) else {
                    continue;
                };
                if similarity >= self.threshold {
                    pairs.push(SimilarityPair {
                        sentence1: s1.to_string(),
                        index1: *i,
                        sentence2: s2.to_string(),
                        index2: *j,
                        similarity,
                    });
                }
            }
        }

        debug!(
            "{} of {} sentence pairs at or above {}",
            pairs.len(),
            first.len() * second.len(),
            self.threshold
        );
        Ok(pairs)
    }
}

fn non_blank(sentences: &[String]) -> Vec<(usize, &str)> {
    sentences
        .iter()
        .map(|s| s.trim())
        .enumerate()
        .filter(|(_, s)| !s.is_empty())
        .collect()
}

/// Cosine similarity in f64. `None` when either vector has zero norm or the
/// lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    // one sqrt: 1 / sqrt(2 * 2) is exactly 0.5
    Some(dot / (norm_a * norm_b).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dissonyx_test_utils::VocabularyEmbedder;

    fn sentences(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_pairs_meet_threshold_in_order() {
        let scorer = SentenceSimilarityScorer::new(Arc::new(VocabularyEmbedder::new()));
        let a = sentences(&["The sky is blue.", "Cats are mammals."]);
        let b = sentences(&["The sky is not blue at all.", "Dogs are mammals too.", "Cats are mammals."]);

        let pairs = scorer.find_similar(&a, &b).await.unwrap();
        let indices: Vec<(usize, usize)> = pairs.iter().map(|p| (p.index1, p.index2)).collect();
        assert_eq!(indices, vec![(0, 0), (1, 1), (1, 2)]);
        assert!(pairs.iter().all(|p| p.similarity >= 0.5));
        assert!((pairs[2].similarity - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_below_threshold_excluded() {
        let scorer = SentenceSimilarityScorer::new(Arc::new(VocabularyEmbedder::new())).with_threshold(0.6);
        let a = sentences(&["Cats are mammals."]);
        let b = sentences(&["Dogs are mammals too."]);
        // cosine is 2 / (sqrt(3) * 2) ~ 0.577
        assert!(scorer.find_similar(&a, &b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let scorer = SentenceSimilarityScorer::new(Arc::new(VocabularyEmbedder::new()));
        // one shared word of two on each side: cosine is exactly 0.5
        let pairs = scorer
            .find_similar(&sentences(&["Alpha beta."]), &sentences(&["Alpha gamma."]))
            .await
            .unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].similarity, 0.5);
    }

    #[tokio::test]
    async fn test_empty_side_skips_embedder() {
        let embedder = Arc::new(VocabularyEmbedder::new());
        let scorer = SentenceSimilarityScorer::new(embedder.clone());
        let a = sentences(&["The sky is blue."]);

        assert!(scorer.find_similar(&[], &a).await.unwrap().is_empty());
        assert!(scorer.find_similar(&a, &[]).await.unwrap().is_empty());
        assert!(scorer.find_similar(&a, &sentences(&["  ", ""])).await.unwrap().is_empty());
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_inputs_are_trimmed() {
        let scorer = SentenceSimilarityScorer::new(Arc::new(VocabularyEmbedder::new()));
        let pairs = scorer
            .find_similar(&sentences(&["  Alpha.  "]), &sentences(&["", "alpha."]))
            .await
            .unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].sentence1, "Alpha.");
        assert_eq!(pairs[0].index2, 1);
    }

    #[test]
    fn test_cosine_zero_norm() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]), Some(1.0));
    }

    #[test]
    fn test_cosine_exact_half() {
        assert_eq!(cosine_similarity(&[1.0, 1.0, 0.0], &[1.0, 0.0, 1.0]), Some(0.5));
    }
}
