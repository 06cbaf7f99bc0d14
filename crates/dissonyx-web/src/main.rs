//! Dissonyx server
//!
//! Run with: cargo run -p dissonyx-web --release

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dissonyx_config::Config;
use dissonyx_embed::{EmbeddingConfig, SentenceEmbedder, SentimentConfig, SentimentModel};
use dissonyx_ingestion::IngestionService;
use dissonyx_kg::ConflictDetector;
use dissonyx_web::{router::build_router, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    info!("Starting Dissonyx server...");

    let models = &config.models;
    let embedder = SentenceEmbedder::new(
        EmbeddingConfig::default()
            .with_model(models.embedding_model.clone())
            .with_max_length(models.max_length)
            .with_batch_size(models.batch_size)
            .with_cache_size(models.cache_size)
            .with_gpu(models.use_gpu),
    )
    .await
    .context("loading sentence embedding model")?;

    let sentiment = SentimentModel::new(
        SentimentConfig::default()
            .with_model(models.sentiment_model.clone())
            .with_max_length(models.max_length)
            .with_gpu(models.use_gpu),
    )
    .await
    .context("loading sentiment model")?;

    let detector = ConflictDetector::new(Arc::new(embedder), Arc::new(sentiment)).with_thresholds(
        config.detection.similarity_threshold,
        config.detection.divergence_threshold,
    );
    let ingestion = IngestionService::new(&config.store.path, Arc::new(detector))
        .with_timeout(config.ingestion.timeout());

    let app = build_router(AppState::new(Arc::new(ingestion)));

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);
    info!("Store: {}", config.store.path);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
