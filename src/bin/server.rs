//! Plume Memory Server
//!
//! HTTP API over the generation pipeline.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plume_memory::{
    Config, Error, FastembedProvider, GeneratedPost, History, LanceStore, OpenAiBackend,
    OpenAiConfig, PostGenerator, PostRequest, SeriesSummary,
};

/// Application state shared across handlers
struct AppState {
    generator: PostGenerator,
}

type SharedState = Arc<AppState>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::default();
    config.ensure_dirs()?;
    tracing::info!("Starting Plume Memory Server on port {}", config.server_port);
    tracing::info!("Data directory: {:?}", config.data_dir);

    // Initialize components
    let embedder = Arc::new(FastembedProvider::new(&config)?);
    let store = Arc::new(LanceStore::new(&config, embedder).await?);
    let llm = Arc::new(OpenAiBackend::new(OpenAiConfig::from_env(&config)?)?);
    let generator = PostGenerator::new(store, llm.clone(), llm, config.clone());

    let state = Arc::new(AppState { generator });

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/generate", post(generate))
        .route("/history/:owner", get(history))
        .route("/series/:owner", get(series))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let port = config.server_port;
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

// === Handlers ===

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

/// Map a core error to a status code plus a stable error code. Persistence
/// failures get their own code: the generated text exists but was not
/// recorded, and the client may want to warn rather than discard.
fn error_response(err: Error) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &err {
        Error::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
        Error::SeriesNotFound(_) => (StatusCode::NOT_FOUND, "series_not_found"),
        Error::SimilaritySearch(_) => (StatusCode::INTERNAL_SERVER_ERROR, "similarity_search"),
        Error::GenerationBackend(_) => (StatusCode::BAD_GATEWAY, "generation_backend"),
        Error::FactExtraction(_) => (StatusCode::BAD_GATEWAY, "fact_extraction"),
        Error::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code,
        }),
    )
}

async fn generate(
    State(state): State<SharedState>,
    Json(request): Json<PostRequest>,
) -> Result<Json<GeneratedPost>, (StatusCode, Json<ErrorResponse>)> {
    state
        .generator
        .generate_post(request)
        .await
        .map(Json)
        .map_err(error_response)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn history(
    State(state): State<SharedState>,
    Path(owner): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<History>, (StatusCode, Json<ErrorResponse>)> {
    state
        .generator
        .get_history(&owner, query.limit.unwrap_or(10))
        .await
        .map(Json)
        .map_err(error_response)
}

#[derive(Debug, Serialize)]
struct SeriesListResponse {
    owner: String,
    total_series: usize,
    series: Vec<SeriesSummary>,
}

async fn series(
    State(state): State<SharedState>,
    Path(owner): Path<String>,
) -> Result<Json<SeriesListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let series = state
        .generator
        .get_series_list(&owner)
        .await
        .map_err(error_response)?;
    Ok(Json(SeriesListResponse {
        owner,
        total_series: series.len(),
        series,
    }))
}
