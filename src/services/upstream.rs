use crate::config::AppConfig;
use crate::error::CatalogError;
use crate::models::{
    EntityKind, Film, FilmProperties, Person, PersonProperties, UpstreamEnvelope, UpstreamRecord,
};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the catalog API.
///
/// Transport errors and 5xx responses are retried with a fixed delay; any
/// other non-success status is returned immediately as `CatalogError::Upstream`.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    attempts: u32,
    retry_delay: Duration,
}

impl UpstreamClient {
    pub fn new(config: &AppConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .user_agent(concat!("holonet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.upstream_api.trim_end_matches('/').to_string(),
            attempts: config.upstream_retries.max(1),
            retry_delay: config.upstream_retry_delay(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn search_people(&self, name: &str) -> Result<Vec<Person>, CatalogError> {
        let envelope: UpstreamEnvelope<Vec<UpstreamRecord<PersonProperties>>> =
            self.search(EntityKind::Person, name).await?;

        envelope.result.into_iter().map(Person::try_from).collect()
    }

    pub async fn search_films(&self, title: &str) -> Result<Vec<Film>, CatalogError> {
        let envelope: UpstreamEnvelope<Vec<UpstreamRecord<FilmProperties>>> =
            self.search(EntityKind::Film, title).await?;

        envelope.result.into_iter().map(Film::try_from).collect()
    }

    pub async fn fetch_person(&self, id: u32) -> Result<Person, CatalogError> {
        let envelope: UpstreamEnvelope<UpstreamRecord<PersonProperties>> =
            self.get_json(&format!("/{}/{id}", EntityKind::Person.collection()), &[])
                .await?;

        Person::try_from(envelope.result)
    }

    pub async fn fetch_film(&self, id: u32) -> Result<Film, CatalogError> {
        let envelope: UpstreamEnvelope<UpstreamRecord<FilmProperties>> =
            self.get_json(&format!("/{}/{id}", EntityKind::Film.collection()), &[])
                .await?;

        Film::try_from(envelope.result)
    }

    /// `GET /people?name=` or `GET /films?title=`
    async fn search<T: DeserializeOwned>(
        &self,
        kind: EntityKind,
        term: &str,
    ) -> Result<T, CatalogError> {
        let path = format!("/{}", kind.collection());
        self.get_json(&path, &[(kind.search_param(), term)]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}{path}", self.base_url);
        let mut attempt = 1;

        loop {
            debug!("GET {url} {query:?} (attempt {attempt}/{})", self.attempts);
            let last_attempt = attempt >= self.attempts;

            match self.client.get(&url).query(query).send().await {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json::<T>()
                        .await
                        .map_err(|e| CatalogError::Decode(format!("{url}: {e}")));
                }
                Ok(response) if response.status().is_server_error() && !last_attempt => {
                    warn!(
                        "Upstream returned {} for {url}, retrying in {:?}",
                        response.status(),
                        self.retry_delay
                    );
                }
                Ok(response) => {
                    return Err(CatalogError::Upstream {
                        status: response.status().as_u16(),
                        url,
                    });
                }
                Err(e) if !last_attempt => {
                    warn!("Request to {url} failed: {e}, retrying in {:?}", self.retry_delay);
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(self.retry_delay).await;
            attempt += 1;
        }
    }
}
