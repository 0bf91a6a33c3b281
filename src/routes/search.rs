use crate::error::{ApiError, CatalogError};
use crate::models::{
    ApiResponse, ClientInfo, EntityKind, SearchEvent, SearchRequest, SearchResult, UserAgentInfo,
};
use crate::services::cache::normalize_query;
use crate::state::AppState;
use log::{debug, warn};
use rocket::serde::json::Json;
use std::time::Instant;

pub const MAX_QUERY_LENGTH: usize = 100;

/// Checks the search body and returns the normalized query.
pub fn validate_query(request: Option<&SearchRequest>) -> Result<String, ApiError> {
    let query = request
        .and_then(|r| r.query.as_deref())
        .map(str::trim)
        .unwrap_or_default();

    if query.is_empty() {
        return Err(ApiError::Validation {
            field: "query".to_string(),
            message: "The query field is required.".to_string(),
        });
    }

    if query.chars().count() > MAX_QUERY_LENGTH {
        return Err(ApiError::Validation {
            field: "query".to_string(),
            message: format!(
                "The query field must not be greater than {MAX_QUERY_LENGTH} characters."
            ),
        });
    }

    Ok(normalize_query(query))
}

fn elapsed_ms(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0
}

/// Runs a search, records it in the search log and wraps the results.
pub async fn perform_search(
    state: &AppState,
    client: ClientInfo,
    kind: EntityKind,
    request: Option<&SearchRequest>,
) -> Result<Json<ApiResponse<Vec<SearchResult>>>, ApiError> {
    let query = validate_query(request)?;

    let started = Instant::now();
    let results = match kind {
        EntityKind::Person => state.catalog.search_people(&query).await,
        EntityKind::Film => state.catalog.search_films(&query).await,
    };
    let response_time_ms = elapsed_ms(started);

    let result_count = u32::try_from(results.len()).unwrap_or(u32::MAX);
    let event = SearchEvent::new(&query, kind, result_count, response_time_ms)
        .with_client_ip(client.ip)
        .with_user_agent(
            client
                .user_agent
                .map(|ua| UserAgentInfo::new(ua, results.is_degraded())),
        );
    record_search(state, event).await;

    Ok(Json(ApiResponse::success(results.results)))
}

async fn record_search(state: &AppState, event: SearchEvent) {
    let database = state.database.clone();

    let outcome =
        tokio::task::spawn_blocking(move || database.append_search_event(&event)).await;

    match outcome {
        Ok(Ok(record)) => debug!(
            "Logged {} search '{}' ({} results)",
            record.search_type, record.query, record.results_count
        ),
        Ok(Err(e)) => warn!("Failed to log search: {e}"),
        Err(e) => warn!("Search logging task failed: {e}"),
    }
}

/// Parses a path id, rejecting anything that is not a positive integer.
pub fn parse_entity_id(raw: &str, kind: EntityKind) -> Result<u32, ApiError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {} ID", kind.as_str())))
}

/// Detail endpoints answer a missing entity, including a missing
/// cross-reference, with their own kind.
pub fn detail_error(kind: EntityKind, err: CatalogError) -> ApiError {
    match err {
        CatalogError::NotFound { .. } => {
            debug!("{kind} detail lookup failed: {err}");
            ApiError::NotFound(format!("{} not found", kind.display_name()))
        }
        other => other.into(),
    }
}
