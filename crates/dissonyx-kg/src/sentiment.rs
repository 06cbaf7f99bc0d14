//! Sentiment divergence between the two sentences of each similar pair.

use std::collections::HashMap;
use std::sync::Arc;

use dissonyx_common::{DivergenceResult, Result, SentimentClassifier, SentimentDistribution, SimilarityPair};

/// L1 distance between the two distributions, scaled by the pair similarity.
pub fn divergence(first: &SentimentDistribution, second: &SentimentDistribution, similarity: f64) -> f64 {
    first.l1_distance(second) * similarity
}

pub struct SentimentDivergenceScorer {
    classifier: Arc<dyn SentimentClassifier>,
}

impl SentimentDivergenceScorer {
    pub fn new(classifier: Arc<dyn SentimentClassifier>) -> Self {
        Self { classifier }
    }

    /// One result per pair, in input order.
    pub async fn score_divergence(&self, pairs: &[SimilarityPair]) -> Result<Vec<DivergenceResult>> {
        // a sentence usually appears in several pairs; classify it once
        let mut seen: HashMap<&str, SentimentDistribution> = HashMap::new();
        let mut results = Vec::with_capacity(pairs.len());

        for pair in pairs {
            let sentiment1 = self.classify_cached(&mut seen, &pair.sentence1).await?;
            let sentiment2 = self.classify_cached(&mut seen, &pair.sentence2).await?;
            results.push(DivergenceResult {
                sentence1: pair.sentence1.clone(),
                sentence2: pair.sentence2.clone(),
                sentiment1,
                sentiment2,
                similarity: pair.similarity,
                divergence: divergence(&sentiment1, &sentiment2, pair.similarity),
            });
        }
        Ok(results)
    }

    async fn classify_cached<'a>(
        &self,
        seen: &mut HashMap<&'a str, SentimentDistribution>,
        sentence: &'a str,
    ) -> Result<SentimentDistribution> {
        if let Some(hit) = seen.get(sentence) {
            return Ok(*hit);
        }
        let distribution = self.classifier.classify(sentence).await?;
        seen.insert(sentence, distribution);
        Ok(distribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dissonyx_test_utils::TableSentiment;

    fn pair(sentence1: &str, sentence2: &str, similarity: f64) -> SimilarityPair {
        SimilarityPair {
            sentence1: sentence1.to_string(),
            index1: 0,
            sentence2: sentence2.to_string(),
            index2: 0,
            similarity,
        }
    }

    fn scorer() -> SentimentDivergenceScorer {
        SentimentDivergenceScorer::new(Arc::new(
            TableSentiment::new()
                .with("Up.", [0.1, 0.2, 0.7])
                .with("Down.", [0.6, 0.3, 0.1])
                .with("Flat.", [0.0, 1.0, 0.0]),
        ))
    }

    #[tokio::test]
    async fn test_divergence_formula_exact() {
        let results = scorer().score_divergence(&[pair("Up.", "Down.", 0.8)]).await.unwrap();
        let r = &results[0];
        let expected = ((0.1f64 - 0.6).abs() + (0.2f64 - 0.3).abs() + (0.7f64 - 0.1).abs()) * 0.8;
        assert_eq!(r.divergence, expected);
        assert_eq!(r.similarity, 0.8);
        assert_eq!(r.sentiment1.positive, 0.7);
    }

    #[tokio::test]
    async fn test_one_result_per_pair_in_order() {
        let pairs = vec![
            pair("Up.", "Down.", 0.9),
            pair("Flat.", "Flat.", 1.0),
            pair("Down.", "Up.", 0.5),
        ];
        let results = scorer().score_divergence(&pairs).await.unwrap();

        assert_eq!(results.len(), 3);
        for (r, p) in results.iter().zip(&pairs) {
            assert_eq!(r.sentence1, p.sentence1);
            assert_eq!(r.sentence2, p.sentence2);
            assert!(r.divergence >= 0.0);
        }
        assert_eq!(results[1].divergence, 0.0);
    }

    #[tokio::test]
    async fn test_no_pairs_no_results() {
        assert!(scorer().score_divergence(&[]).await.unwrap().is_empty());
    }
}
