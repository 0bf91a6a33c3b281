use crate::config::AppConfig;
use crate::database::DatabaseService;
use crate::error::StatsError;
use crate::models::{
    DailyCount, EntityKind, GeneralStats, QueryCount, RecentStats, StatsSnapshot, TopQuery,
    TypeBreakdown, TypeStats,
};
use crate::services::cache::StatsCache;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const TOP_QUERIES_LIMIT: i64 = 5;
pub const TYPE_TOP_QUERIES_LIMIT: i64 = 3;
pub const RECENT_DAYS: u32 = 7;

/// A queued request to rebuild the stats snapshot.
#[derive(Debug, Clone)]
pub struct RecomputeJob {
    pub reason: &'static str,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecomputePolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RecomputePolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            attempts: config.recompute_attempts.max(1),
            backoff: config.recompute_backoff(),
        }
    }
}

impl Default for RecomputePolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
pub enum RecomputeOutcome {
    Updated(StatsSnapshot),
    /// The search log is empty; nothing was cached.
    InsufficientData,
    /// Every attempt failed. The previous snapshot, if any, is left in place.
    Failed(StatsError),
}

/// Owns the stats lifecycle: serves the cached snapshot, hands recompute
/// work to the background worker and runs that work.
#[derive(Debug)]
pub struct StatsAggregator {
    database: Arc<DatabaseService>,
    cache: StatsCache,
    jobs: mpsc::UnboundedSender<RecomputeJob>,
    policy: RecomputePolicy,
}

impl StatsAggregator {
    /// Returns the aggregator and the receiving end of its job queue, which
    /// the worker task consumes.
    pub fn new(
        database: Arc<DatabaseService>,
        cache: StatsCache,
        policy: RecomputePolicy,
    ) -> (Self, mpsc::UnboundedReceiver<RecomputeJob>) {
        let (jobs, receiver) = mpsc::unbounded_channel();
        (
            Self {
                database,
                cache,
                jobs,
                policy,
            },
            receiver,
        )
    }

    pub fn has_valid_stats(&self) -> bool {
        self.cache.has()
    }

    pub fn get_snapshot(&self) -> Option<StatsSnapshot> {
        self.cache.get()
    }

    pub fn is_calculating(&self) -> bool {
        self.cache.is_calculating()
    }

    /// Enqueues a recompute unless one is already pending or running.
    /// Returns whether a job was enqueued.
    pub fn request_refresh(&self) -> bool {
        self.request_refresh_for("on-demand")
    }

    pub fn request_refresh_for(&self, reason: &'static str) -> bool {
        if !self.cache.try_mark_calculating() {
            info!("Stats recompute already in progress, skipping {reason} request");
            return false;
        }

        let job = RecomputeJob {
            reason,
            requested_at: Utc::now(),
        };
        match self.jobs.send(job) {
            Ok(()) => {
                info!("Stats recompute queued ({reason})");
                true
            }
            Err(_) => {
                error!("Stats worker is not running, dropping {reason} recompute");
                self.cache.mark_calculated();
                false
            }
        }
    }

    /// Worker body. Holds the calculating guard for the whole run, including
    /// retry backoff, and always releases it before returning.
    pub async fn recompute(&self) -> RecomputeOutcome {
        let mut attempt = 1;

        loop {
            self.cache.mark_calculating();

            match self.compute_once().await {
                Ok(Some(snapshot)) => {
                    self.cache.put(&snapshot);
                    self.cache.mark_calculated();
                    info!(
                        "Stats recomputed: {} searches, {} top queries",
                        snapshot.general.total_searches,
                        snapshot.top_queries.len()
                    );
                    return RecomputeOutcome::Updated(snapshot);
                }
                Ok(None) => {
                    warn!("Not enough data to calculate stats");
                    self.cache.mark_calculated();
                    return RecomputeOutcome::InsufficientData;
                }
                Err(e) if attempt < self.policy.attempts => {
                    warn!(
                        "Stats recompute attempt {attempt}/{} failed: {e}, retrying in {:?}",
                        self.policy.attempts, self.policy.backoff
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "Stats recompute failed after {} attempts: {e}",
                        self.policy.attempts
                    );
                    self.cache.mark_calculated();
                    return RecomputeOutcome::Failed(e);
                }
            }
        }
    }

    /// Computes and caches a snapshot on the calling task, bypassing the
    /// queue and the calculating guard.
    pub async fn force_refresh(&self) -> Result<StatsSnapshot, StatsError> {
        let database = self.database.clone();
        let snapshot =
            tokio::task::spawn_blocking(move || compute_snapshot(&database, Utc::now())).await??;

        self.cache.put(&snapshot);
        Ok(snapshot)
    }

    async fn compute_once(&self) -> Result<Option<StatsSnapshot>, StatsError> {
        let database = self.database.clone();

        tokio::task::spawn_blocking(move || -> Result<Option<StatsSnapshot>, StatsError> {
            if database.count_searches(None)? == 0 {
                return Ok(None);
            }
            Ok(Some(compute_snapshot(&database, Utc::now())?))
        })
        .await?
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(count as f64 * 100.0 / total as f64)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn type_stats(database: &DatabaseService, kind: EntityKind) -> Result<TypeStats, StatsError> {
    let top_queries = database
        .popular_queries(Some(kind), TYPE_TOP_QUERIES_LIMIT)?
        .into_iter()
        .map(|row| QueryCount {
            query: row.query,
            count: to_u64(row.search_count),
        })
        .collect();

    Ok(TypeStats {
        total_searches: to_u64(database.count_searches(Some(kind))?),
        avg_response_time_ms: round2(database.average_response_time(Some(kind))?.unwrap_or(0.0)),
        avg_result_count: round2(database.average_results_count(Some(kind))?.unwrap_or(0.0)),
        top_queries,
    })
}

fn recent_stats(database: &DatabaseService, now: DateTime<Utc>) -> Result<RecentStats, StatsError> {
    let window_start = now - ChronoDuration::days(i64::from(RECENT_DAYS));
    let total_in_window = to_u64(database.count_searches_between(window_start.naive_utc(), None)?);

    let mut daily_breakdown = Vec::with_capacity(RECENT_DAYS as usize);
    for days_ago in (0..RECENT_DAYS).rev() {
        let date = (now - ChronoDuration::days(i64::from(days_ago))).date_naive();
        let day_start = date.and_time(NaiveTime::MIN);
        let day_end = day_start + ChronoDuration::days(1);

        daily_breakdown.push(DailyCount {
            date,
            count: to_u64(database.count_searches_between(day_start, Some(day_end))?),
        });
    }

    Ok(RecentStats {
        window_days: RECENT_DAYS,
        total_in_window,
        avg_per_day: round2(total_in_window as f64 / f64::from(RECENT_DAYS)),
        daily_breakdown,
    })
}

/// Builds a snapshot from the search log as of `now`. Blocking.
pub fn compute_snapshot(
    database: &DatabaseService,
    now: DateTime<Utc>,
) -> Result<StatsSnapshot, StatsError> {
    let total_searches = to_u64(database.count_searches(None)?);

    let top_queries = database
        .popular_queries(None, TOP_QUERIES_LIMIT)?
        .into_iter()
        .filter_map(|row| match row.search_type.parse::<EntityKind>() {
            Ok(kind) => {
                let count = to_u64(row.search_count);
                Some(TopQuery {
                    query: row.query,
                    kind,
                    count,
                    percentage_of_total: percentage(count, total_searches),
                })
            }
            Err(e) => {
                warn!("Ignoring search log group '{}': {e}", row.query);
                None
            }
        })
        .collect();

    Ok(StatsSnapshot {
        generated_at: now,
        general: GeneralStats {
            total_searches,
            average_response_time_ms: round2(database.average_response_time(None)?.unwrap_or(0.0)),
            most_popular_hour: database.most_popular_hour()?,
        },
        top_queries,
        by_type: TypeBreakdown {
            person: type_stats(database, EntityKind::Person)?,
            film: type_stats(database, EntityKind::Film)?,
        },
        recent: recent_stats(database, now)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(5, 5), 100.0);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(150.456), 150.46);
        assert_eq!(round2(3.0 / 7.0), 0.43);
    }

    #[test]
    fn test_policy_never_drops_below_one_attempt() {
        let config = AppConfig {
            recompute_attempts: 0,
            ..AppConfig::default()
        };
        let policy = RecomputePolicy::from_config(&config);
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.backoff, Duration::from_secs(60));
    }
}
