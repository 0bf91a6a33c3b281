pub mod cache;
pub mod catalog;
pub mod scheduler;
pub mod stats;
pub mod upstream;

pub use crate::database::DatabaseService;
pub use cache::{CacheStore, EntityCache, InMemoryStore, StatsCache};
pub use catalog::CatalogService;
pub use scheduler::{StatsScheduler, StatsWorker, spawn_stats_tasks};
pub use stats::{RecomputeOutcome, RecomputePolicy, StatsAggregator};
pub use upstream::UpstreamClient;
