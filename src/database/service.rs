use super::connection::{DbConnection, DbPool, create_pool, get_connection_with_retry};
use super::search_log::{QueryCountRow, SearchLogOperations};
use crate::models::{EntityKind, NewSearchQueryRecord, SearchEvent, SearchQueryRecord};
use chrono::NaiveDateTime;
use log::warn;

/// Main database service that provides a unified interface to all database operations
#[derive(Debug)]
pub struct DatabaseService {
    pub pool: DbPool,
}

impl DatabaseService {
    /// Creates a new DatabaseService with an initialized connection pool
    pub fn new(database_url: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = create_pool(database_url)?;
        Ok(Self { pool })
    }

    /// Gets a connection from the pool with retry logic
    pub fn get_connection(&self) -> Result<DbConnection, diesel::r2d2::Error> {
        get_connection_with_retry(&self.pool)
    }

    // Search log operations
    pub fn append_search_event(
        &self,
        event: &SearchEvent,
    ) -> Result<SearchQueryRecord, diesel::result::Error> {
        let ops = SearchLogOperations::new(&self.pool);
        ops.append(&NewSearchQueryRecord::from(event))
    }

    /// Latest events first. Rows that no longer decode are skipped.
    pub fn recent_search_events(
        &self,
        limit: i64,
    ) -> Result<Vec<SearchEvent>, diesel::result::Error> {
        let ops = SearchLogOperations::new(&self.pool);
        let records = ops.recent(limit)?;

        Ok(records
            .into_iter()
            .filter_map(|record| {
                let id = record.id;
                SearchEvent::try_from(record)
                    .map_err(|e| warn!("Skipping search log row {id}: {e}"))
                    .ok()
            })
            .collect())
    }

    pub fn count_searches(&self, kind: Option<EntityKind>) -> Result<i64, diesel::result::Error> {
        let ops = SearchLogOperations::new(&self.pool);
        ops.count(kind)
    }

    pub fn count_searches_between(
        &self,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
    ) -> Result<i64, diesel::result::Error> {
        let ops = SearchLogOperations::new(&self.pool);
        ops.count_between(start, end)
    }

    pub fn average_response_time(
        &self,
        kind: Option<EntityKind>,
    ) -> Result<Option<f64>, diesel::result::Error> {
        let ops = SearchLogOperations::new(&self.pool);
        ops.average_response_time(kind)
    }

    pub fn average_results_count(
        &self,
        kind: Option<EntityKind>,
    ) -> Result<Option<f64>, diesel::result::Error> {
        let ops = SearchLogOperations::new(&self.pool);
        ops.average_results_count(kind)
    }

    pub fn most_popular_hour(&self) -> Result<Option<u32>, diesel::result::Error> {
        let ops = SearchLogOperations::new(&self.pool);
        ops.most_popular_hour()
    }

    pub fn popular_queries(
        &self,
        kind: Option<EntityKind>,
        limit: i64,
    ) -> Result<Vec<QueryCountRow>, diesel::result::Error> {
        let ops = SearchLogOperations::new(&self.pool);
        ops.popular_queries(kind, limit)
    }
}
