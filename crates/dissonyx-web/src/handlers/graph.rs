//! Knowledge graph read API.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use dissonyx_common::{ApiError, Conflict, PaperRecord, Topic};
use dissonyx_kg::StoreStats;

use crate::state::SharedState;

// === API Types ===

#[derive(Debug, Serialize)]
pub struct ApiPaperConflicts {
    pub paper: String,
    /// Ids of papers in conflict with this one, in either direction.
    pub conflicting_papers: Vec<String>,
    pub conflicts: Vec<Conflict>,
}

#[derive(Debug, Serialize)]
pub struct ApiGraphHash {
    pub graph_hash: String,
}

// === API Endpoints ===

/// GET /api/topics
pub async fn api_topics(State(state): State<SharedState>) -> Result<Json<Vec<Topic>>, ApiError> {
    let store = state.ingestion.snapshot().await?;
    Ok(Json(store.all_topics()))
}

/// GET /api/topics/{topic}/papers
pub async fn api_topic_papers(
    State(state): State<SharedState>,
    Path(topic): Path<String>,
) -> Result<Json<Vec<PaperRecord>>, ApiError> {
    let store = state.ingestion.snapshot().await?;
    if store.topic(&topic).is_none() {
        return Err(ApiError::not_found(format!("topic {topic}")));
    }
    Ok(Json(store.papers_with_topic(&topic)))
}

/// GET /api/papers/{paper}/conflicts
pub async fn api_paper_conflicts(
    State(state): State<SharedState>,
    Path(paper): Path<String>,
) -> Result<Json<ApiPaperConflicts>, ApiError> {
    let store = state.ingestion.snapshot().await?;
    let Some(found) = store.paper(&paper) else {
        return Err(ApiError::not_found(format!("paper {paper}")));
    };

    Ok(Json(ApiPaperConflicts {
        paper: found.id.clone(),
        conflicting_papers: store.conflicting_papers(&found.id).into_iter().collect(),
        conflicts: store.conflicts_for_paper(&found.id).into_iter().cloned().collect(),
    }))
}

/// GET /api/graph/stats
pub async fn api_graph_stats(State(state): State<SharedState>) -> Result<Json<StoreStats>, ApiError> {
    let store = state.ingestion.snapshot().await?;
    Ok(Json(store.stats()))
}

/// GET /api/graph/hash
pub async fn api_graph_hash(State(state): State<SharedState>) -> Result<Json<ApiGraphHash>, ApiError> {
    let store = state.ingestion.snapshot().await?;
    Ok(Json(ApiGraphHash { graph_hash: store.content_hash()? }))
}

/// GET /api/graph.ttl
pub async fn api_graph_turtle(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let store = state.ingestion.snapshot().await?;
    Ok(([(header::CONTENT_TYPE, "text/turtle; charset=utf-8")], store.to_turtle()?))
}
