use crate::models::{EntityKind, Film, FilmDetail, Person, PersonDetail, SearchEvent};
use chrono::{DateTime, Utc};
use rocket::request::{FromRequest, Outcome, Request};
use serde::{Deserialize, Serialize};

/// `{success, message?, data}` envelope used by every JSON endpoint.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn pending(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct SearchRequest {
    pub query: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct PersonView {
    pub id: u32,
    pub name: String,
    pub birth_year: String,
    pub gender: String,
    pub eye_color: String,
    pub hair_color: String,
    pub height: String,
    pub mass: String,
}

impl From<&Person> for PersonView {
    fn from(person: &Person) -> Self {
        PersonView {
            id: person.id,
            name: person.name.clone(),
            birth_year: person.birth_year.clone(),
            gender: person.gender.clone(),
            eye_color: person.eye_color.clone(),
            hair_color: person.hair_color.clone(),
            height: person.height.clone(),
            mass: person.mass.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct FilmView {
    pub id: u32,
    pub title: String,
    pub opening_crawl: String,
}

impl From<&Film> for FilmView {
    fn from(film: &Film) -> Self {
        FilmView {
            id: film.id,
            title: film.title.clone(),
            opening_crawl: film.opening_crawl.clone(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct PersonDetailResponse {
    pub person: PersonView,
    pub films: Vec<FilmView>,
}

impl From<&PersonDetail> for PersonDetailResponse {
    fn from(detail: &PersonDetail) -> Self {
        PersonDetailResponse {
            person: PersonView::from(&detail.person),
            films: detail.films.iter().map(FilmView::from).collect(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct FilmDetailResponse {
    pub film: FilmView,
    pub characters: Vec<PersonView>,
}

impl From<&FilmDetail> for FilmDetailResponse {
    fn from(detail: &FilmDetail) -> Self {
        FilmDetailResponse {
            film: FilmView::from(&detail.film),
            characters: detail.characters.iter().map(PersonView::from).collect(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct CacheStatsResponse {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
    pub entity_ttl_secs: u64,
    pub stats_ttl_secs: u64,
    pub stats_cached: bool,
    pub stats_calculating: bool,
}

/// Search log entry as exposed over HTTP. Client details are left out.
#[derive(Serialize, Debug)]
pub struct RecentSearchView {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub results_count: u32,
    pub response_time_ms: f64,
    pub upstream_failed: bool,
    pub searched_at: DateTime<Utc>,
}

impl From<&SearchEvent> for RecentSearchView {
    fn from(event: &SearchEvent) -> Self {
        RecentSearchView {
            query: event.query.clone(),
            kind: event.kind,
            results_count: event.result_count,
            response_time_ms: event.response_time_ms,
            upstream_failed: event.user_agent.as_ref().is_some_and(|ua| ua.error),
            searched_at: event.occurred_at,
        }
    }
}

/// Caller details recorded alongside each search event.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientInfo {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(ClientInfo {
            ip: request.client_ip().map(|ip| ip.to_string()),
            user_agent: request
                .headers()
                .get_one("User-Agent")
                .filter(|ua| !ua.is_empty())
                .map(|ua| ua.to_string()),
        })
    }
}
