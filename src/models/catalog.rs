use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discriminant shared by catalog entities, cache keys and search events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Film,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "person",
            EntityKind::Film => "film",
        }
    }

    /// Collection name used by the upstream API and by search cache keys.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Person => "people",
            EntityKind::Film => "films",
        }
    }

    /// Query parameter the upstream search endpoint filters on.
    pub fn search_param(&self) -> &'static str {
        match self {
            EntityKind::Person => "name",
            EntityKind::Film => "title",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Person => "Person",
            EntityKind::Film => "Film",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "person" | "people" => Ok(EntityKind::Person),
            "film" | "films" => Ok(EntityKind::Film),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: u32,
    pub name: String,
    pub birth_year: String,
    pub gender: String,
    pub eye_color: String,
    pub hair_color: String,
    pub height: String,
    pub mass: String,
    pub film_ids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Film {
    pub id: u32,
    pub title: String,
    pub opening_crawl: String,
    pub character_ids: Vec<u32>,
}

/// Entity as stored in the shared cache, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CachedEntity {
    Person(Person),
    Film(Film),
}

impl CachedEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            CachedEntity::Person(_) => EntityKind::Person,
            CachedEntity::Film(_) => EntityKind::Film,
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            CachedEntity::Person(person) => person.id,
            CachedEntity::Film(film) => film.id,
        }
    }
}

/// Lightweight `{id, name}` projection returned by searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultSet {
    pub results: Vec<SearchResult>,
    /// Set when the upstream call failed and the empty set is a fallback.
    #[serde(skip)]
    pub degraded: bool,
}

impl SearchResultSet {
    pub fn degraded() -> Self {
        Self {
            results: Vec::new(),
            degraded: true,
        }
    }

    pub fn from_people(people: &[Person]) -> Self {
        Self {
            results: people
                .iter()
                .map(|p| SearchResult {
                    id: p.id,
                    name: p.name.clone(),
                })
                .collect(),
            degraded: false,
        }
    }

    pub fn from_films(films: &[Film]) -> Self {
        Self {
            results: films
                .iter()
                .map(|f| SearchResult {
                    id: f.id,
                    name: f.title.clone(),
                })
                .collect(),
            degraded: false,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonDetail {
    pub person: Person,
    pub films: Vec<Film>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilmDetail {
    pub film: Film,
    pub characters: Vec<Person>,
}

// Upstream wire format: {"result": ...} envelopes around {"uid", "properties"} records

#[derive(Debug, Deserialize)]
pub struct UpstreamEnvelope<T> {
    pub result: T,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UpstreamUid {
    Text(String),
    Number(u64),
}

impl UpstreamUid {
    fn parse(&self) -> Result<u32, CatalogError> {
        let id = match self {
            UpstreamUid::Text(text) => text
                .trim()
                .parse::<u32>()
                .map_err(|e| CatalogError::Decode(format!("invalid uid '{text}': {e}")))?,
            UpstreamUid::Number(n) => u32::try_from(*n)
                .map_err(|_| CatalogError::Decode(format!("uid {n} out of range")))?,
        };

        if id == 0 {
            return Err(CatalogError::Decode("uid must be positive".to_string()));
        }
        Ok(id)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpstreamRecord<P> {
    pub uid: UpstreamUid,
    pub properties: P,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PersonProperties {
    pub name: String,
    pub birth_year: String,
    pub gender: String,
    pub eye_color: String,
    pub hair_color: String,
    pub height: String,
    pub mass: String,
    pub films: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilmProperties {
    pub title: String,
    pub opening_crawl: String,
    pub characters: Vec<String>,
}

/// Extracts the numeric id from a cross-reference URL such as
/// `https://www.swapi.tech/api/films/1`.
pub fn parse_reference_id(url: &str) -> Option<u32> {
    url.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<u32>().ok())
        .filter(|id| *id > 0)
}

fn parse_references(urls: &[String]) -> Vec<u32> {
    urls.iter()
        .filter_map(|url| {
            let id = parse_reference_id(url);
            if id.is_none() {
                log::debug!("Skipping malformed cross-reference: {url}");
            }
            id
        })
        .collect()
}

impl TryFrom<UpstreamRecord<PersonProperties>> for Person {
    type Error = CatalogError;

    fn try_from(record: UpstreamRecord<PersonProperties>) -> Result<Self, Self::Error> {
        let id = record.uid.parse()?;
        let props = record.properties;
        Ok(Person {
            id,
            film_ids: parse_references(&props.films),
            name: props.name,
            birth_year: props.birth_year,
            gender: props.gender,
            eye_color: props.eye_color,
            hair_color: props.hair_color,
            height: props.height,
            mass: props.mass,
        })
    }
}

impl TryFrom<UpstreamRecord<FilmProperties>> for Film {
    type Error = CatalogError;

    fn try_from(record: UpstreamRecord<FilmProperties>) -> Result<Self, Self::Error> {
        let id = record.uid.parse()?;
        let props = record.properties;
        Ok(Film {
            id,
            character_ids: parse_references(&props.characters),
            title: props.title,
            opening_crawl: props.opening_crawl,
        })
    }
}
