use crate::models::EntityKind;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Immutable aggregate report computed from the search log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub generated_at: DateTime<Utc>,
    pub general: GeneralStats,
    pub top_queries: Vec<TopQuery>,
    pub by_type: TypeBreakdown,
    pub recent: RecentStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralStats {
    pub total_searches: u64,
    pub average_response_time_ms: f64,
    pub most_popular_hour: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopQuery {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub count: u64,
    pub percentage_of_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCount {
    pub query: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeStats {
    pub total_searches: u64,
    pub avg_response_time_ms: f64,
    pub avg_result_count: f64,
    pub top_queries: Vec<QueryCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeBreakdown {
    pub person: TypeStats,
    pub film: TypeStats,
}

impl TypeBreakdown {
    pub fn get(&self, kind: EntityKind) -> &TypeStats {
        match kind {
            EntityKind::Person => &self.person,
            EntityKind::Film => &self.film,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentStats {
    pub window_days: u32,
    pub total_in_window: u64,
    pub avg_per_day: f64,
    pub daily_breakdown: Vec<DailyCount>,
}

// Reader-facing rendering of a snapshot

#[derive(Debug, Serialize)]
pub struct FormattedValue<T: Serialize> {
    pub value: Option<T>,
    pub formatted: String,
}

#[derive(Debug, Serialize)]
pub struct ResponseTimeView {
    pub ms: Option<f64>,
    pub formatted: String,
}

#[derive(Debug, Serialize)]
pub struct HourView {
    pub hour: Option<u32>,
    pub formatted: String,
}

#[derive(Debug, Serialize)]
pub struct GeneralView {
    pub total_searches: u64,
    pub average_response_time: ResponseTimeView,
    pub most_popular_hour: HourView,
}

#[derive(Debug, Serialize)]
pub struct RankedQueryView {
    pub rank: usize,
    pub query: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct TypeStatsView {
    pub total_searches: u64,
    pub avg_response_time: ResponseTimeView,
    pub avg_results: FormattedValue<f64>,
    pub top_queries: Vec<QueryCount>,
}

#[derive(Debug, Serialize)]
pub struct TypeBreakdownView {
    pub people: TypeStatsView,
    pub films: TypeStatsView,
}

#[derive(Debug, Serialize)]
pub struct RecentView {
    pub total_recent: u64,
    pub avg_per_day: FormattedValue<f64>,
    pub daily_breakdown: Vec<DailyCount>,
}

#[derive(Debug, Serialize)]
pub struct StatsResource {
    pub last_updated: DateTime<Utc>,
    pub general: GeneralView,
    pub top_queries: Vec<RankedQueryView>,
    pub by_type: TypeBreakdownView,
    pub recent: RecentView,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// One decimal, rounding halves away from zero.
fn format_one_decimal(value: f64) -> String {
    format!("{:.1}", round_to(value, 1))
}

fn response_time_view(ms: f64) -> ResponseTimeView {
    ResponseTimeView {
        ms: Some(round_to(ms, 2)),
        formatted: format!("{}ms", ms.round()),
    }
}

fn hour_view(hour: Option<u32>) -> HourView {
    match hour {
        Some(hour) => HourView {
            hour: Some(hour),
            formatted: format!("{hour:02}:00h"),
        },
        None => HourView {
            hour: None,
            formatted: "N/A".to_string(),
        },
    }
}

fn type_stats_view(stats: &TypeStats) -> TypeStatsView {
    TypeStatsView {
        total_searches: stats.total_searches,
        avg_response_time: response_time_view(stats.avg_response_time_ms),
        avg_results: FormattedValue {
            value: Some(stats.avg_result_count),
            formatted: format_one_decimal(stats.avg_result_count),
        },
        top_queries: stats.top_queries.clone(),
    }
}

impl From<&StatsSnapshot> for StatsResource {
    fn from(snapshot: &StatsSnapshot) -> Self {
        StatsResource {
            last_updated: snapshot.generated_at,
            general: GeneralView {
                total_searches: snapshot.general.total_searches,
                average_response_time: response_time_view(
                    snapshot.general.average_response_time_ms,
                ),
                most_popular_hour: hour_view(snapshot.general.most_popular_hour),
            },
            top_queries: snapshot
                .top_queries
                .iter()
                .enumerate()
                .map(|(index, q)| RankedQueryView {
                    rank: index + 1,
                    query: q.query.clone(),
                    kind: q.kind,
                    count: q.count,
                    percentage: round_to(q.percentage_of_total, 1),
                })
                .collect(),
            by_type: TypeBreakdownView {
                people: type_stats_view(&snapshot.by_type.person),
                films: type_stats_view(&snapshot.by_type.film),
            },
            recent: RecentView {
                total_recent: snapshot.recent.total_in_window,
                avg_per_day: FormattedValue {
                    value: Some(snapshot.recent.avg_per_day),
                    formatted: format!(
                        "{} per day",
                        format_one_decimal(snapshot.recent.avg_per_day)
                    ),
                },
                daily_breakdown: snapshot.recent.daily_breakdown.clone(),
            },
        }
    }
}
