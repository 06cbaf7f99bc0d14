//! Liveness and store location.

use axum::{extract::State, response::IntoResponse, Json};

use crate::state::SharedState;

/// GET /health
pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "store": state.ingestion.store_path().display().to_string(),
        "subscribers": state.event_tx.receiver_count(),
    }))
}
