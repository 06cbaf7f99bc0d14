//! Shared application state for the web server.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use dissonyx_ingestion::{IngestionService, SubmissionEvent};

/// Activity pushed to every SSE subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A websocket session opened
    ClientConnected { session_id: String },
    /// A websocket session closed
    ClientDisconnected { session_id: String },
    /// A submitted paper was stored
    PaperAdded { paper: String },
    /// A candidate paper of a topic was processed
    TopicProgress { paper: String, topic: String, conflicts: usize, progress: u8 },
    /// A submission finished and the store was saved
    GraphUpdated { paper: String, graph_hash: String },
    /// A submission was aborted
    SubmissionFailed { paper: String, message: String },
}

impl AppEvent {
    /// Wire name, also used as the SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            AppEvent::ClientConnected { .. } => "client_connected",
            AppEvent::ClientDisconnected { .. } => "client_disconnected",
            AppEvent::PaperAdded { .. } => "paper_added",
            AppEvent::TopicProgress { .. } => "topic_progress",
            AppEvent::GraphUpdated { .. } => "graph_updated",
            AppEvent::SubmissionFailed { .. } => "submission_failed",
        }
    }

    /// Feed summary of a submission event for `paper`.
    pub fn from_submission(paper: &str, event: &SubmissionEvent) -> Self {
        let paper = paper.to_string();
        match event {
            SubmissionEvent::PaperAdded { .. } => AppEvent::PaperAdded { paper },
            SubmissionEvent::Conflict(p) => AppEvent::TopicProgress {
                paper,
                topic: p.topic.clone(),
                conflicts: p.conflicts.len(),
                progress: p.progress,
            },
            SubmissionEvent::GraphHash { graph_hash } => AppEvent::GraphUpdated {
                paper,
                graph_hash: graph_hash.clone(),
            },
            SubmissionEvent::Error { message, .. } => AppEvent::SubmissionFailed {
                paper,
                message: message.clone(),
            },
        }
    }
}

/// Shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionService>,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(ingestion: Arc<IngestionService>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            ingestion,
            event_tx,
            started_at: Instant::now(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast to SSE subscribers; dropped when nobody listens.
    pub fn publish(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }
}

pub type SharedState = Arc<AppState>;
