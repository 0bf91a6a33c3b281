pub mod config;
pub mod database;
pub mod error;
pub mod fairings;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod state;

use rocket::{Build, Config, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use std::sync::Arc;

pub use config::AppConfig;
pub use fairings::{RequestLogger, StatsBackground};
pub use services::{
    CatalogService, DatabaseService, EntityCache, InMemoryStore, StatsAggregator, StatsCache,
    UpstreamClient,
};
pub use state::AppState;

/// Wires the services together and returns an unlaunched Rocket.
pub fn build_rocket(config: AppConfig) -> Result<Rocket<Build>, Box<dyn std::error::Error>> {
    // Single cache store shared by the catalog and the stats pipeline
    let cache = Arc::new(InMemoryStore::new());

    let database = Arc::new(DatabaseService::new(&config.database_url)?);

    let upstream = UpstreamClient::new(&config)?;
    let catalog = CatalogService::new(
        EntityCache::new(cache.clone(), config.entity_ttl()),
        upstream,
    );

    let stats_cache = StatsCache::new(
        cache.clone(),
        config.stats_ttl(),
        config.calculating_ttl(),
    );
    let (stats, jobs) = StatsAggregator::new(
        database.clone(),
        stats_cache,
        services::RecomputePolicy::from_config(&config),
    );
    let stats = Arc::new(stats);

    let background = StatsBackground::new(
        stats.clone(),
        cache.clone(),
        jobs,
        config.stats_refresh_interval(),
    );

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .to_cors()?;

    let rocket_config = Config {
        port: config.port,
        address: config.host.parse()?,
        ..Config::default()
    };

    let state = AppState {
        config,
        cache,
        database,
        catalog,
        stats,
    };

    Ok(rocket::custom(&rocket_config)
        .manage(state)
        .attach(cors)
        .attach(RequestLogger)
        .attach(background)
        .mount("/", routes::get_routes()))
}

pub fn create_rocket() -> Rocket<Build> {
    // Load configuration from environment
    let config = AppConfig::from_env();

    build_rocket(config).expect("Failed to initialize application")
}
