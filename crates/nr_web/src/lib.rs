use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/", get(handlers::root))
        .route("/fetch-news", get(handlers::fetch_news))
        .route("/articles/:id", get(handlers::get_article))
        .route("/similar-articles/:id", get(handlers::similar_articles))
        .route("/analyze-article/:id", get(handlers::analyze_article))
        .route("/topic-clusters", get(handlers::topic_clusters))
        .route("/trending-analysis", get(handlers::trending_analysis))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Binds `addr` and serves the API until the process stops.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> nr_core::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::{create_router, serve, AppState};
    pub use nr_core::{Article, Error, Result};
}
