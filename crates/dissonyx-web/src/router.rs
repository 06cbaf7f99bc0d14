//! Axum router: maps all URL paths to handlers.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{
    graph::{api_graph_hash, api_graph_stats, api_graph_turtle, api_paper_conflicts, api_topic_papers, api_topics},
    system::health,
};
use crate::sse::sse_handler;
use crate::state::{AppState, SharedState};
use crate::ws::ws_handler;

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        .route("/health", get(health))

        // Submission channel
        .route("/ws", get(ws_handler))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // API endpoints
        .route("/api/topics",                  get(api_topics))
        .route("/api/topics/{topic}/papers",   get(api_topic_papers))
        .route("/api/papers/{paper}/conflicts", get(api_paper_conflicts))
        .route("/api/graph/stats",             get(api_graph_stats))
        .route("/api/graph/hash",              get(api_graph_hash))
        .route("/api/graph.ttl",               get(api_graph_turtle))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
