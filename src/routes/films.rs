use super::search::{detail_error, parse_entity_id, perform_search};
use crate::error::ApiError;
use crate::models::{
    ApiResponse, ClientInfo, EntityKind, FilmDetailResponse, SearchRequest, SearchResult,
};
use crate::state::AppState;
use rocket::serde::json::Json;
use rocket::{State, get, post};

#[post("/api/films/search", data = "<request>")]
pub async fn search_films(
    state: &State<AppState>,
    client: ClientInfo,
    request: Option<Json<SearchRequest>>,
) -> Result<Json<ApiResponse<Vec<SearchResult>>>, ApiError> {
    perform_search(state, client, EntityKind::Film, request.as_deref()).await
}

#[get("/api/films/<id>")]
pub async fn get_film(
    id: &str,
    state: &State<AppState>,
) -> Result<Json<ApiResponse<FilmDetailResponse>>, ApiError> {
    let id = parse_entity_id(id, EntityKind::Film)?;
    let detail = state
        .catalog
        .get_film_detail(id)
        .await
        .map_err(|e| detail_error(EntityKind::Film, e))?;

    Ok(Json(ApiResponse::success(FilmDetailResponse::from(&detail))))
}
