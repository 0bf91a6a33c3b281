use crate::config::AppConfig;
use crate::services::{CatalogService, DatabaseService, InMemoryStore, StatsAggregator};
use std::sync::Arc;

#[derive(Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub cache: Arc<InMemoryStore>,
    pub database: Arc<DatabaseService>,
    pub catalog: CatalogService,
    pub stats: Arc<StatsAggregator>,
}
