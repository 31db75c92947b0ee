use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use nr_core::VectorStore;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub k: Option<usize>,
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Welcome to the News Radar API",
    }))
}

pub async fn fetch_news(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let report = state.ingest.ingest().await?;
    if let Err(e) = state.storage.flush().await {
        tracing::warn!(error = %e, "Failed to persist store after ingest");
    }
    Ok(Json(json!({
        "status": "success",
        "fetched": report.fetched,
        "embedded": report.embedded,
        "failed_feeds": report.failed_feeds,
        "articles": report.articles,
    })))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let record = state.storage.get(&id).await?;
    Ok(Json(json!({
        "status": "success",
        "article": record.article,
        "embedded": record.is_embedded(),
    })))
}

pub async fn similar_articles(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<SimilarQuery>,
) -> ApiResult<Json<Value>> {
    let similar = state.recommender.recommend(&id, query.k).await?;
    Ok(Json(json!({
        "status": "success",
        "article_id": id,
        "similar_articles": similar,
    })))
}

pub async fn analyze_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let record = state.storage.get(&id).await?;
    let analysis = state.analyzer.analyze(&id).await?;
    Ok(Json(json!({
        "status": "success",
        "article": record.article,
        "analysis": analysis,
    })))
}

pub async fn topic_clusters(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let run = state.clusters.current().await?;
    Ok(Json(json!({
        "status": "success",
        "run_id": run.run_id,
        "created_at": run.created_at,
        "clusters": run.clusters,
    })))
}

pub async fn trending_analysis(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let report = state.trends.trending_report().await?;
    Ok(Json(json!({
        "status": "success",
        "run_id": report.run_id,
        "generated_at": report.generated_at,
        "trending_analysis": report.narrative,
        "narrative_failed": report.narrative_failed,
        "digest": report.digest,
    })))
}
