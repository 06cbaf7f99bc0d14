//! Router tests against a store populated through the real submission
//! pipeline with deterministic model fakes.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

use dissonyx_ingestion::{IngestionService, Submission};
use dissonyx_kg::ConflictDetector;
use dissonyx_test_utils::{temp_store, NegationSentiment, PaperFixture, VocabularyEmbedder};
use dissonyx_web::router::build_router;
use dissonyx_web::state::{AppEvent, AppState};

struct Harness {
    _dir: TempDir,
    ingestion: Arc<IngestionService>,
}

impl Harness {
    async fn with_papers(papers: &[PaperFixture]) -> Self {
        let (dir, path) = temp_store();
        let detector = ConflictDetector::new(Arc::new(VocabularyEmbedder::new()), Arc::new(NegationSentiment));
        let ingestion = Arc::new(IngestionService::new(path, Arc::new(detector)));

        for paper in papers {
            let (tx, _rx) = mpsc::unbounded_channel();
            ingestion
                .submit(Submission::new(paper.name, paper.topics.clone(), paper.conclusion), tx)
                .await
                .unwrap();
        }
        Self { _dir: dir, ingestion }
    }

    fn router(&self) -> Router {
        build_router(AppState::new(self.ingestion.clone()))
    }

    async fn get(&self, uri: &str) -> (StatusCode, String, Option<String>) {
        let response = self
            .router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap(), content_type)
    }

    async fn get_json(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, body, _) = self.get(uri).await;
        (status, serde_json::from_str(&body).unwrap())
    }
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::with_papers(&[]).await;
    let (status, body) = harness.get_json("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_topics_and_papers() {
    let harness = Harness::with_papers(&[PaperFixture::sky_b(), PaperFixture::sky_a().with_topics(&["x", "Sky Colour"])]).await;

    let (status, topics) = harness.get_json("/api/topics").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = topics.as_array().unwrap().iter().map(|t| t["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["sky_colour", "x"]);

    let (status, papers) = harness.get_json("/api/topics/x/papers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(papers.as_array().unwrap().len(), 2);
    assert_eq!(papers[0]["uri"], "http://example.org/paper/a");

    let (status, body) = harness.get_json("/api/topics/nothing/papers").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "topic nothing");
}

#[tokio::test]
async fn test_paper_conflicts_are_symmetric() {
    let harness = Harness::with_papers(&[PaperFixture::sky_b(), PaperFixture::sky_a()]).await;

    let (status, body) = harness.get_json("/api/papers/B/conflicts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paper"], "b");
    assert_eq!(body["conflicting_papers"], serde_json::json!(["a"]));
    assert_eq!(body["conflicts"][0]["paper1"], "a");

    let (status, _) = harness.get_json("/api/papers/Unknown%20Paper/conflicts").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_and_hash_match_store() {
    let harness = Harness::with_papers(&[PaperFixture::sky_b(), PaperFixture::sky_a(), PaperFixture::unrelated()]).await;

    let (_, stats) = harness.get_json("/api/graph/stats").await;
    assert_eq!(stats, serde_json::json!({"topics": 1, "papers": 3, "conflicts": 1}));

    let (_, hash) = harness.get_json("/api/graph/hash").await;
    let expected = harness.ingestion.snapshot().await.unwrap().content_hash().unwrap();
    assert_eq!(hash["graph_hash"], expected);
}

#[tokio::test]
async fn test_turtle_export() {
    let harness = Harness::with_papers(&[PaperFixture::sky_b(), PaperFixture::sky_a()]).await;

    let (status, body, content_type) = harness.get("/api/graph.ttl").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/turtle; charset=utf-8"));
    assert!(body.contains("@prefix pco: <http://example.org/paper_conflict_ontology#>"));
    assert!(body.contains("<http://example.org/paper/a>"));
    assert!(body.contains("<http://example.org/paper/b>"));
    assert!(body.contains("pco:hasConflictWith"));
}

#[tokio::test]
async fn test_empty_store_api() {
    let harness = Harness::with_papers(&[]).await;
    let (status, topics) = harness.get_json("/api/topics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(topics, serde_json::json!([]));
}

#[tokio::test]
async fn test_activity_feed_names_frames() {
    let harness = Harness::with_papers(&[]).await;
    let state = AppState::new(harness.ingestion.clone());
    let feed = state.clone();

    let response = build_router(state)
        .oneshot(Request::builder().uri("/api/events").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    feed.publish(AppEvent::PaperAdded { paper: "A".to_string() });
    let mut body = response.into_body().into_data_stream();
    let chunk = body.next().await.unwrap().unwrap();
    let frame = String::from_utf8(chunk.to_vec()).unwrap();

    assert!(frame.contains("id: 0\n"));
    assert!(frame.contains("event: paper_added\n"));
    assert!(frame.contains(r#"data: {"type":"paper_added","paper":"A"}"#));
}
