//! Websocket submission channel.
//!
//! Client → server: `{"event": "add_paper", "data": {title, topics, text}}`
//! or `{"event": "ping"}`. Server → client: `connection_response` on
//! connect, then the submission events of each `add_paper` in order.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use dissonyx_ingestion::{Submission, SubmissionEvent};

use crate::state::{AppEvent, SharedState};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    AddPaper(Submission),
    Ping,
}

/// Session-level messages that are not part of a submission.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionMessage {
    ConnectionResponse { status: String },
    Pong,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: SharedState) {
    let session_id = Uuid::new_v4().to_string();
    info!(session_id = %session_id, "Client connected");
    state.publish(AppEvent::ClientConnected { session_id: session_id.clone() });

    let hello = SessionMessage::ConnectionResponse { status: "connected".to_string() };
    if send_json(&mut socket, &hello).await.is_ok() {
        while let Some(Ok(ws_msg)) = socket.recv().await {
            let text = match ws_msg {
                Message::Text(t) => t.to_string(),
                Message::Close(_) => break,
                _ => continue,
            };

            let client_msg: ClientMessage = match serde_json::from_str(&text) {
                Ok(m) => m,
                Err(e) => {
                    let err = SubmissionEvent::error(format!("Invalid message: {}", e));
                    if send_json(&mut socket, &err).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let sent = match client_msg {
                ClientMessage::Ping => send_json(&mut socket, &SessionMessage::Pong).await,
                ClientMessage::AddPaper(submission) => run_submission(&mut socket, &state, submission).await,
            };
            if sent.is_err() {
                break;
            }
        }
    }

    info!(session_id = %session_id, "Client disconnected");
    state.publish(AppEvent::ClientDisconnected { session_id });
}

/// Run one submission to completion, relaying its events to the socket and
/// the activity feed. The submission keeps running if the client goes away.
async fn run_submission(socket: &mut WebSocket, state: &SharedState, submission: Submission) -> Result<(), axum::Error> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let title = submission.title.clone();
    let service = state.ingestion.clone();
    let task = tokio::spawn(async move { service.submit(submission, tx).await });

    // ends once the task drops its sender
    let mut delivered = Ok(());
    while let Some(event) = rx.recv().await {
        state.publish(AppEvent::from_submission(&title, &event));
        if delivered.is_ok() {
            delivered = send_json(socket, &event).await;
        }
    }

    if let Err(e) = task.await {
        warn!(error = %e, "Submission task aborted");
        let event = SubmissionEvent::error(format!("Submission aborted: {}", e));
        state.publish(AppEvent::from_submission(&title, &event));
        if delivered.is_ok() {
            delivered = send_json(socket, &event).await;
        }
    }
    delivered
}

async fn send_json<T: Serialize>(socket: &mut WebSocket, msg: &T) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}
