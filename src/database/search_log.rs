use super::connection::{DbPool, checkout};
use crate::models::{EntityKind, NewSearchQueryRecord, SearchQueryRecord};
use crate::schema::search_queries;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Integer, Nullable, Text};

#[derive(QueryableByName)]
struct AverageResult {
    #[diesel(sql_type = Nullable<Double>)]
    value: Option<f64>,
}

#[derive(QueryableByName)]
struct HourCountRow {
    #[diesel(sql_type = Integer)]
    hour: i32,
    #[diesel(sql_type = BigInt)]
    #[allow(dead_code)]
    search_count: i64,
}

/// Occurrences of one `(query, type)` pair in the search log.
#[derive(QueryableByName, Debug, Clone, PartialEq)]
pub struct QueryCountRow {
    #[diesel(sql_type = Text)]
    pub query: String,
    #[diesel(sql_type = Text)]
    pub search_type: String,
    #[diesel(sql_type = BigInt)]
    pub search_count: i64,
}

/// Append-only search log with the aggregate queries the stats pipeline needs
pub struct SearchLogOperations<'a> {
    pool: &'a DbPool,
}

impl<'a> SearchLogOperations<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Appends one search event
    pub fn append(
        &self,
        record: &NewSearchQueryRecord,
    ) -> Result<SearchQueryRecord, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        diesel::insert_into(search_queries::table)
            .values(record)
            .returning(SearchQueryRecord::as_returning())
            .get_result(&mut conn)
    }

    /// Most recent events first
    pub fn recent(&self, limit: i64) -> Result<Vec<SearchQueryRecord>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        search_queries::table
            .order((search_queries::searched_at.desc(), search_queries::id.desc()))
            .limit(limit)
            .select(SearchQueryRecord::as_select())
            .load(&mut conn)
    }

    /// Counts events, optionally restricted to one search type
    pub fn count(&self, kind: Option<EntityKind>) -> Result<i64, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        match kind {
            Some(kind) => search_queries::table
                .filter(search_queries::search_type.eq(kind.as_str()))
                .count()
                .get_result(&mut conn),
            None => search_queries::table.count().get_result(&mut conn),
        }
    }

    /// Counts events in `[start, end)`
    pub fn count_between(
        &self,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
    ) -> Result<i64, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        match end {
            Some(end) => search_queries::table
                .filter(search_queries::searched_at.ge(start))
                .filter(search_queries::searched_at.lt(end))
                .count()
                .get_result(&mut conn),
            None => search_queries::table
                .filter(search_queries::searched_at.ge(start))
                .count()
                .get_result(&mut conn),
        }
    }

    pub fn average_response_time(
        &self,
        kind: Option<EntityKind>,
    ) -> Result<Option<f64>, diesel::result::Error> {
        self.average_of("response_time_ms", kind)
    }

    pub fn average_results_count(
        &self,
        kind: Option<EntityKind>,
    ) -> Result<Option<f64>, diesel::result::Error> {
        self.average_of("results_count", kind)
    }

    fn average_of(
        &self,
        column: &'static str,
        kind: Option<EntityKind>,
    ) -> Result<Option<f64>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        let result = match kind {
            Some(kind) => diesel::sql_query(format!(
                "SELECT CAST(AVG({column}) AS DOUBLE) AS value FROM search_queries WHERE search_type = ?"
            ))
            .bind::<Text, _>(kind.as_str())
            .get_result::<AverageResult>(&mut conn)?,
            None => diesel::sql_query(format!(
                "SELECT CAST(AVG({column}) AS DOUBLE) AS value FROM search_queries"
            ))
            .get_result::<AverageResult>(&mut conn)?,
        };

        Ok(result.value)
    }

    /// Hour of day (0-23) with the most events; ties go to the earliest hour
    pub fn most_popular_hour(&self) -> Result<Option<u32>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        let row = diesel::sql_query(
            "SELECT CAST(strftime('%H', searched_at) AS INTEGER) AS hour, COUNT(*) AS search_count \
             FROM search_queries \
             GROUP BY hour \
             ORDER BY search_count DESC, hour ASC \
             LIMIT 1",
        )
        .get_result::<HourCountRow>(&mut conn)
        .optional()?;

        Ok(row.and_then(|r| u32::try_from(r.hour).ok()))
    }

    /// Groups events by `(query, type)` and returns the most frequent pairs
    pub fn popular_queries(
        &self,
        kind: Option<EntityKind>,
        limit: i64,
    ) -> Result<Vec<QueryCountRow>, diesel::result::Error> {
        let mut conn = checkout(self.pool)?;

        match kind {
            Some(kind) => diesel::sql_query(
                "SELECT query, search_type, COUNT(*) AS search_count \
                 FROM search_queries \
                 WHERE search_type = ? \
                 GROUP BY query, search_type \
                 ORDER BY search_count DESC, query ASC \
                 LIMIT ?",
            )
            .bind::<Text, _>(kind.as_str())
            .bind::<BigInt, _>(limit)
            .load::<QueryCountRow>(&mut conn),
            None => diesel::sql_query(
                "SELECT query, search_type, COUNT(*) AS search_count \
                 FROM search_queries \
                 GROUP BY query, search_type \
                 ORDER BY search_count DESC, query ASC, search_type ASC \
                 LIMIT ?",
            )
            .bind::<BigInt, _>(limit)
            .load::<QueryCountRow>(&mut conn),
        }
    }
}
