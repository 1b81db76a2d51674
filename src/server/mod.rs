//! HTTP boundary - one axum adapter over the core operations
//!
//! The transport carries no policy: every handler delegates to a store or
//! service call and maps its error to a status code. The boundary accepts
//! all origins unauthenticated; the scraping client is a browser extension.

use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::storage::GraphStore;

pub mod routes;

/// Server state. The single store connection sits behind a mutex, so every
/// multi-step write is serialized with everything else on the connection.
pub struct AppState {
    pub store: Mutex<GraphStore>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/api/posts/batch", post(routes::ingest_batch))
        .route("/api/posts", get(routes::recent_posts))
        .route("/api/posts/filtered", get(routes::filtered_posts))
        .route("/api/discovery/stats", get(routes::discovery_stats))
        .route("/api/stats", get(routes::overall_stats))
        .route("/api/cleanup/run", post(routes::run_cleanup))
        .route("/api/cleanup/rules", get(routes::cleanup_rules))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(host: &str, port: u16, database_path: &Path) -> anyhow::Result<()> {
    let store = GraphStore::open(database_path)?;
    store.seed_default_rules()?;

    let state = Arc::new(AppState {
        store: Mutex::new(store),
    });
    let app = router(state);

    tracing::info!("Starting server on {}:{}", host, port);
    println!("🌍 Serving knowledge graph at http://{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
