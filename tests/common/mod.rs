#![allow(dead_code)]

use chrono::{DateTime, Utc};
use holonet::models::{EntityKind, SearchEvent};
use holonet::{AppConfig, DatabaseService};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;

pub const SWAPI: &str = "https://www.swapi.tech/api";

/// Config pointing at a mock upstream and a throwaway database, with short
/// retry delays.
pub fn test_config(upstream: &str, database_url: &str) -> AppConfig {
    AppConfig {
        upstream_api: upstream.to_string(),
        database_url: database_url.to_string(),
        upstream_retries: 2,
        upstream_retry_delay_ms: 1,
        recompute_attempts: 2,
        recompute_backoff_secs: 0,
        ..AppConfig::default()
    }
}

pub struct TestDatabase {
    pub database: Arc<DatabaseService>,
    pub url: String,
    _temp_dir: TempDir, // Keep alive for cleanup
}

pub fn temp_database() -> TestDatabase {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let url = temp_dir
        .path()
        .join("holonet.db")
        .to_string_lossy()
        .to_string();
    let database = Arc::new(DatabaseService::new(&url).expect("Failed to initialize database"));

    TestDatabase {
        database,
        url,
        _temp_dir: temp_dir,
    }
}

pub fn log_search(
    database: &DatabaseService,
    query: &str,
    kind: EntityKind,
    results: u32,
    response_time_ms: f64,
    at: DateTime<Utc>,
) {
    let event = SearchEvent::new(query, kind, results, response_time_ms).occurred_at(at);
    database
        .append_search_event(&event)
        .expect("Failed to append search event");
}

pub fn person_record(id: u32, name: &str, film_ids: &[u32]) -> Value {
    json!({
        "uid": id.to_string(),
        "properties": {
            "name": name,
            "birth_year": "19BBY",
            "gender": "male",
            "eye_color": "blue",
            "hair_color": "blond",
            "height": "172",
            "mass": "77",
            "films": film_ids
                .iter()
                .map(|id| format!("{SWAPI}/films/{id}"))
                .collect::<Vec<_>>(),
            "url": format!("{SWAPI}/people/{id}")
        }
    })
}

pub fn film_record(id: u32, title: &str, character_ids: &[u32]) -> Value {
    json!({
        "uid": id.to_string(),
        "properties": {
            "title": title,
            "opening_crawl": "It is a period of civil war.",
            "episode_id": id,
            "characters": character_ids
                .iter()
                .map(|id| format!("{SWAPI}/people/{id}"))
                .collect::<Vec<_>>(),
            "url": format!("{SWAPI}/films/{id}")
        }
    })
}

pub fn envelope(result: Value) -> Value {
    json!({ "message": "ok", "result": result })
}
