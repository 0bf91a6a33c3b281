use crate::error::ApiError;
use crate::models::{ApiResponse, CacheStatsResponse, RecentSearchView};
use crate::services::CacheStore;
use crate::services::cache::STATS_CACHE_KEY;
use crate::state::AppState;
use log::info;
use rocket::serde::json::Json;
use rocket::{State, delete, get};

const DEFAULT_RECENT_LIMIT: i64 = 20;
const MAX_RECENT_LIMIT: i64 = 100;

// Health check endpoint
#[get("/api/health")]
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

#[get("/api/cache/stats")]
pub async fn get_cache_stats(state: &State<AppState>) -> Json<CacheStatsResponse> {
    let stats = state.cache.stats();

    Json(CacheStatsResponse {
        total_entries: stats.total_entries,
        expired_entries: stats.expired_entries,
        hit_count: stats.hit_count,
        miss_count: stats.miss_count,
        hit_rate: stats.hit_rate(),
        entity_ttl_secs: state.config.entity_ttl_secs,
        stats_ttl_secs: state.config.stats_ttl_secs,
        stats_cached: state.cache.has(STATS_CACHE_KEY),
        stats_calculating: state.stats.is_calculating(),
    })
}

#[delete("/api/cache")]
pub async fn clear_cache(state: &State<AppState>) -> Json<serde_json::Value> {
    let removed = state.cache.flush();
    info!("Cache cleared via API ({removed} entries)");

    Json(serde_json::json!({
        "success": true,
        "message": "Cache cleared successfully",
        "removed_entries": removed
    }))
}

#[get("/api/searches/recent?<limit>")]
pub async fn recent_searches(
    state: &State<AppState>,
    limit: Option<i64>,
) -> Result<Json<ApiResponse<Vec<RecentSearchView>>>, ApiError> {
    let limit = limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    let database = state.database.clone();

    let events = tokio::task::spawn_blocking(move || database.recent_search_events(limit))
        .await
        .map_err(|e| ApiError::InternalServerError(e.to_string()))??;

    Ok(Json(ApiResponse::success(
        events.iter().map(RecentSearchView::from).collect(),
    )))
}
