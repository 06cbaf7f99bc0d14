//! End-to-end submission runs against deterministic model fakes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

use dissonyx_common::{DissonyxError, Result, TextEmbedder};
use dissonyx_ingestion::{IngestionService, Submission, SubmissionEvent};
use dissonyx_kg::{ConflictDetector, KnowledgeStore};
use dissonyx_test_utils::{temp_store, NegationSentiment, PaperFixture, VocabularyEmbedder};

fn service(path: &std::path::Path) -> IngestionService {
    let detector = ConflictDetector::new(Arc::new(VocabularyEmbedder::new()), Arc::new(NegationSentiment));
    IngestionService::new(path, Arc::new(detector))
}

fn submission(paper: &PaperFixture) -> Submission {
    Submission::new(paper.name, paper.topics.clone(), paper.conclusion)
}

async fn submit(service: &IngestionService, submission: Submission) -> (Result<String>, Vec<SubmissionEvent>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let outcome = service.submit(submission, tx).await;
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    (outcome, events)
}

#[tokio::test]
async fn test_conflicting_paper_end_to_end() {
    let (_dir, path) = temp_store();
    let service = service(&path);

    let (_, first) = submit(&service, submission(&PaperFixture::sky_b())).await;
    // B is alone under "x"
    assert_eq!(first.len(), 3);

    let (outcome, events) = submit(&service, submission(&PaperFixture::sky_a())).await;
    let graph_hash = assert_ok!(outcome);

    assert_eq!(events.len(), 3);
    assert_eq!(events[0], SubmissionEvent::paper_added());

    let SubmissionEvent::Conflict(progress) = &events[1] else {
        panic!("expected conflict event, got {:?}", events[1]);
    };
    assert_eq!(progress.topic, "x");
    assert_eq!(progress.progress, 100);
    assert_eq!(progress.conflicts.len(), 1);
    let conflict = &progress.conflicts[0];
    assert_eq!(conflict.paper1, "a");
    assert_eq!(conflict.paper2, "b");
    assert_eq!(conflict.sentence1, "The sky is blue.");
    assert_eq!(conflict.sentence2, "The sky is not blue at all.");
    assert!(conflict.divergence > 1.0);

    assert_eq!(events[2], SubmissionEvent::GraphHash { graph_hash: graph_hash.clone() });
    assert!(events[2].is_terminal());

    // hash covers exactly the persisted bytes
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(graph_hash, hex::encode(Sha256::digest(&bytes)));

    let store = KnowledgeStore::load(&path).unwrap();
    assert_eq!(store.stats().papers, 2);
    assert_eq!(store.stats().conflicts, 1);
    assert_eq!(store.conflicting_papers("B").into_iter().collect::<Vec<_>>(), vec!["a"]);
}

#[tokio::test]
async fn test_resubmission_adds_topic() {
    let (_dir, path) = temp_store();
    let service = service(&path);

    submit(&service, submission(&PaperFixture::sky_b())).await.0.unwrap();
    let again = PaperFixture::sky_b().with_topics(&["y"]);
    let (outcome, events) = submit(&service, Submission::new(again.name, again.topics, "Different text.")).await;
    assert_ok!(outcome);
    assert_eq!(events.len(), 3);

    let store = KnowledgeStore::load(&path).unwrap();
    let paper = store.paper("B").unwrap();
    assert_eq!(paper.conclusion, PaperFixture::sky_b().conclusion);
    assert_eq!(paper.topics.iter().cloned().collect::<Vec<_>>(), vec!["x", "y"]);
    assert_eq!(store.papers_with_topic("x").len(), 1);
    assert_eq!(store.papers_with_topic("y").len(), 1);
}

#[tokio::test]
async fn test_resubmission_compares_stored_conclusion() {
    let (_dir, path) = temp_store();
    let service = service(&path);

    submit(&service, Submission::new("B", vec!["x".to_string()], "Cats are mammals.")).await.0.unwrap();
    submit(&service, Submission::new("C", vec!["y".to_string()], "The sky is not blue at all.")).await.0.unwrap();

    // new text would conflict with C, the stored text does not
    let (outcome, events) = submit(&service, Submission::new("B", vec!["y".to_string()], "The sky is blue.")).await;
    assert_ok!(outcome);
    let SubmissionEvent::Conflict(progress) = &events[1] else {
        panic!("expected conflict event, got {:?}", events[1]);
    };
    assert_eq!(progress.topic, "y");
    assert!(progress.conflicts.is_empty());

    let store = KnowledgeStore::load(&path).unwrap();
    assert_eq!(store.paper("B").unwrap().conclusion, "Cats are mammals.");
    assert_eq!(store.stats().conflicts, 0);
}

#[tokio::test]
async fn test_blank_title_is_single_error() {
    let (_dir, path) = temp_store();
    let service = service(&path);

    let (outcome, events) = submit(&service, Submission::new(" ", vec!["x".to_string()], "Text.")).await;

    assert!(matches!(outcome, Err(DissonyxError::InvalidSubmission(_))));
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], SubmissionEvent::Error { status, .. } if status == "error"));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_corrupt_store_aborts_before_paper_added() {
    let (_dir, path) = temp_store();
    std::fs::write(&path, "not a store").unwrap();
    let service = service(&path);

    let (outcome, events) = submit(&service, submission(&PaperFixture::sky_a())).await;

    assert_err!(outcome);
    assert_eq!(events.len(), 1);
    let SubmissionEvent::Error { message, .. } = &events[0] else {
        panic!("expected error event");
    };
    assert!(message.contains("failed to parse"));
}

struct StallingEmbedder;

#[async_trait]
impl TextEmbedder for StallingEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_timeout_reported_as_error() {
    let (_dir, path) = temp_store();
    let detector = ConflictDetector::new(Arc::new(StallingEmbedder), Arc::new(NegationSentiment));
    let service = IngestionService::new(&path, Arc::new(detector)).with_timeout(Duration::from_secs(1));

    submit(&service, submission(&PaperFixture::sky_b())).await.0.unwrap();
    let (outcome, events) = submit(&service, submission(&PaperFixture::sky_a())).await;

    assert!(matches!(outcome, Err(DissonyxError::Timeout(1))));
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], SubmissionEvent::paper_added());
    assert_eq!(events[1], SubmissionEvent::error("Submission timed out after 1s"));
}

#[tokio::test]
async fn test_concurrent_submissions_keep_both_papers() {
    let (_dir, path) = temp_store();
    let service = service(&path);

    let (a, b) = tokio::join!(
        submit(&service, submission(&PaperFixture::sky_a())),
        submit(&service, submission(&PaperFixture::sky_b())),
    );
    assert_ok!(a.0);
    assert_ok!(b.0);

    let store = service.snapshot().await.unwrap();
    assert_eq!(store.stats().papers, 2);
    // whichever ran second saw the first
    assert_eq!(store.stats().conflicts, 1);
}
