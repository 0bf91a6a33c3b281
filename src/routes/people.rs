use super::search::{detail_error, parse_entity_id, perform_search};
use crate::error::ApiError;
use crate::models::{
    ApiResponse, ClientInfo, EntityKind, PersonDetailResponse, SearchRequest, SearchResult,
};
use crate::state::AppState;
use rocket::serde::json::Json;
use rocket::{State, get, post};

#[post("/api/people/search", data = "<request>")]
pub async fn search_people(
    state: &State<AppState>,
    client: ClientInfo,
    request: Option<Json<SearchRequest>>,
) -> Result<Json<ApiResponse<Vec<SearchResult>>>, ApiError> {
    perform_search(state, client, EntityKind::Person, request.as_deref()).await
}

#[get("/api/people/<id>")]
pub async fn get_person(
    id: &str,
    state: &State<AppState>,
) -> Result<Json<ApiResponse<PersonDetailResponse>>, ApiError> {
    let id = parse_entity_id(id, EntityKind::Person)?;
    let detail = state
        .catalog
        .get_person_detail(id)
        .await
        .map_err(|e| detail_error(EntityKind::Person, e))?;

    Ok(Json(ApiResponse::success(PersonDetailResponse::from(&detail))))
}
