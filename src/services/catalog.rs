use crate::error::CatalogError;
use crate::models::{EntityKind, Film, FilmDetail, Person, PersonDetail, SearchResultSet};
use crate::services::cache::{EntityCache, normalize_query};
use crate::services::upstream::UpstreamClient;
use log::{debug, warn};

/// Search and lookup flows over the entity cache and the upstream API.
///
/// Searches never fail: an upstream error yields an empty, degraded result
/// set. Lookups report any upstream failure as `NotFound`; decode errors are
/// returned as is.
#[derive(Debug, Clone)]
pub struct CatalogService {
    cache: EntityCache,
    upstream: UpstreamClient,
}

impl CatalogService {
    pub fn new(cache: EntityCache, upstream: UpstreamClient) -> Self {
        Self { cache, upstream }
    }

    pub async fn search_people(&self, query: &str) -> SearchResultSet {
        let query = normalize_query(query);
        if let Some(cached) = self.cache.get_search(EntityKind::Person, &query) {
            return cached;
        }

        match self.upstream.search_people(&query).await {
            Ok(people) => {
                for person in &people {
                    self.cache.put_person(person);
                }
                let results = SearchResultSet::from_people(&people);
                self.cache.put_search(EntityKind::Person, &query, &results);
                results
            }
            Err(e) => {
                warn!("People search failed for '{query}': {e}");
                SearchResultSet::degraded()
            }
        }
    }

    pub async fn search_films(&self, query: &str) -> SearchResultSet {
        let query = normalize_query(query);
        if let Some(cached) = self.cache.get_search(EntityKind::Film, &query) {
            return cached;
        }

        match self.upstream.search_films(&query).await {
            Ok(films) => {
                for film in &films {
                    self.cache.put_film(film);
                }
                let results = SearchResultSet::from_films(&films);
                self.cache.put_search(EntityKind::Film, &query, &results);
                results
            }
            Err(e) => {
                warn!("Films search failed for '{query}': {e}");
                SearchResultSet::degraded()
            }
        }
    }

    pub async fn get_person(&self, id: u32) -> Result<Person, CatalogError> {
        if let Some(person) = self.cache.get_person(id) {
            return Ok(person);
        }

        let person = self
            .upstream
            .fetch_person(id)
            .await
            .map_err(|e| lookup_failure(EntityKind::Person, id, e))?;
        self.cache.put_person(&person);
        Ok(person)
    }

    pub async fn get_film(&self, id: u32) -> Result<Film, CatalogError> {
        if let Some(film) = self.cache.get_film(id) {
            return Ok(film);
        }

        let film = self
            .upstream
            .fetch_film(id)
            .await
            .map_err(|e| lookup_failure(EntityKind::Film, id, e))?;
        self.cache.put_film(&film);
        Ok(film)
    }

    /// Person plus their films, in the order the person lists them.
    pub async fn get_person_detail(&self, id: u32) -> Result<PersonDetail, CatalogError> {
        let person = self.get_person(id).await?;

        let mut films = Vec::with_capacity(person.film_ids.len());
        for film_id in &person.film_ids {
            films.push(self.get_film(*film_id).await?);
        }
        debug!("Resolved {} films for person {id}", films.len());

        Ok(PersonDetail { person, films })
    }

    /// Film plus its characters, in the order the film lists them.
    pub async fn get_film_detail(&self, id: u32) -> Result<FilmDetail, CatalogError> {
        let film = self.get_film(id).await?;

        let mut characters = Vec::with_capacity(film.character_ids.len());
        for person_id in &film.character_ids {
            characters.push(self.get_person(*person_id).await?);
        }
        debug!("Resolved {} characters for film {id}", characters.len());

        Ok(FilmDetail { film, characters })
    }
}

fn lookup_failure(kind: EntityKind, id: u32, err: CatalogError) -> CatalogError {
    match err {
        CatalogError::Upstream { .. } | CatalogError::Network(_) => {
            warn!("{} details failed for {id}: {err}", kind.display_name());
            CatalogError::NotFound { kind, id }
        }
        other => other,
    }
}
