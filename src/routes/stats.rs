use crate::error::ApiError;
use crate::models::{ApiResponse, StatsResource};
use crate::state::AppState;
use log::info;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{State, get, post};

pub const STATS_PENDING_MESSAGE: &str =
    "Stats are being calculated. Please try again in a few moments.";

#[get("/api/stats")]
pub async fn get_stats(state: &State<AppState>) -> Custom<Json<ApiResponse<StatsResource>>> {
    match state.stats.get_snapshot() {
        Some(snapshot) => Custom(
            Status::Ok,
            Json(
                ApiResponse::success(StatsResource::from(&snapshot))
                    .with_message("Stats retrieved successfully."),
            ),
        ),
        None => {
            state.stats.request_refresh();
            Custom(
                Status::Accepted,
                Json(ApiResponse::pending(STATS_PENDING_MESSAGE)),
            )
        }
    }
}

/// Recomputes synchronously and returns the fresh snapshot.
#[post("/api/stats/refresh")]
pub async fn refresh_stats(
    state: &State<AppState>,
) -> Result<Json<ApiResponse<StatsResource>>, ApiError> {
    let snapshot = state.stats.force_refresh().await?;
    info!(
        "Stats force-refreshed ({} searches)",
        snapshot.general.total_searches
    );

    Ok(Json(
        ApiResponse::success(StatsResource::from(&snapshot)).with_message("Stats refreshed."),
    ))
}
