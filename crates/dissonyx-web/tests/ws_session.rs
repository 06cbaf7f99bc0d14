//! Websocket sessions against a live server on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use dissonyx_ingestion::IngestionService;
use dissonyx_kg::ConflictDetector;
use dissonyx_test_utils::{temp_store, NegationSentiment, PaperFixture, VocabularyEmbedder};
use dissonyx_web::router::build_router;
use dissonyx_web::state::AppState;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> (TempDir, SocketAddr) {
    let (dir, path) = temp_store();
    let detector = ConflictDetector::new(Arc::new(VocabularyEmbedder::new()), Arc::new(NegationSentiment));
    let ingestion = Arc::new(IngestionService::new(path, Arc::new(detector)));
    let app = build_router(AppState::new(ingestion));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (dir, addr)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

/// Next text frame as JSON, skipping control frames.
async fn next_json(client: &mut Client) -> Value {
    loop {
        let msg = client.next().await.unwrap().unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send(client: &mut Client, text: &str) {
    client.send(Message::Text(text.into())).await.unwrap();
}

fn add_paper(paper: &PaperFixture) -> String {
    json!({
        "event": "add_paper",
        "data": {"title": paper.name, "topics": paper.topics, "text": paper.conclusion}
    })
    .to_string()
}

#[tokio::test]
async fn test_session_greets_and_survives_bad_input() {
    let (_dir, addr) = spawn_server().await;
    let mut client = connect(addr).await;

    assert_eq!(
        next_json(&mut client).await,
        json!({"event": "connection_response", "data": {"status": "connected"}})
    );

    send(&mut client, "not json").await;
    let error = next_json(&mut client).await;
    assert_eq!(error["event"], "error");
    assert_eq!(error["data"]["status"], "error");
    assert!(error["data"]["message"].as_str().unwrap().starts_with("Invalid message"));

    // session is still open
    send(&mut client, r#"{"event": "ping"}"#).await;
    assert_eq!(next_json(&mut client).await, json!({"event": "pong"}));
}

#[tokio::test]
async fn test_add_paper_streams_submission_events() {
    let (_dir, addr) = spawn_server().await;
    let mut client = connect(addr).await;
    next_json(&mut client).await;

    send(&mut client, &add_paper(&PaperFixture::sky_b())).await;
    let events: Vec<Value> = [
        next_json(&mut client).await,
        next_json(&mut client).await,
        next_json(&mut client).await,
    ]
    .into();
    let names: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["paper_added", "conflict", "graph_hash"]);

    send(&mut client, &add_paper(&PaperFixture::sky_a())).await;
    assert_eq!(next_json(&mut client).await, json!({"event": "paper_added", "data": {"status": "success"}}));

    let progress = next_json(&mut client).await;
    assert_eq!(progress["event"], "conflict");
    assert_eq!(progress["data"]["topic"], "x");
    assert_eq!(progress["data"]["progress"], 100);
    let conflicts = progress["data"]["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["sentence2"], "The sky is not blue at all.");

    let done = next_json(&mut client).await;
    assert_eq!(done["event"], "graph_hash");
    assert_eq!(done["data"]["graph_hash"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_blank_title_reported_over_socket() {
    let (_dir, addr) = spawn_server().await;
    let mut client = connect(addr).await;
    next_json(&mut client).await;

    send(&mut client, r#"{"event": "add_paper", "data": {"title": "  ", "topics": ["x"], "text": "Text."}}"#).await;
    let error = next_json(&mut client).await;
    assert_eq!(error["event"], "error");

    send(&mut client, r#"{"event": "ping"}"#).await;
    assert_eq!(next_json(&mut client).await, json!({"event": "pong"}));
}
