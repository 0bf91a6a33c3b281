use crate::models::EntityKind;
use crate::schema::search_queries;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

// Search log row - one per search attempt, never updated
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = search_queries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SearchQueryRecord {
    pub id: i32,
    pub query: String,
    pub search_type: String,
    pub results_count: i32,
    pub response_time_ms: f64,
    pub user_ip: Option<String>,
    pub user_agent: Option<String>, // JSON object as text
    pub searched_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = search_queries)]
pub struct NewSearchQueryRecord {
    pub query: String,
    pub search_type: String,
    pub results_count: i32,
    pub response_time_ms: f64,
    pub user_ip: Option<String>,
    pub user_agent: Option<String>,
    pub searched_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

/// Raw User-Agent header plus a flag marking searches that failed upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgentInfo {
    pub string: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl UserAgentInfo {
    pub fn new(raw: impl Into<String>, error: bool) -> Self {
        Self {
            string: raw.into(),
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchEvent {
    pub query: String,
    pub kind: EntityKind,
    pub result_count: u32,
    pub response_time_ms: f64,
    pub client_ip: Option<String>,
    pub user_agent: Option<UserAgentInfo>,
    pub occurred_at: DateTime<Utc>,
}

impl SearchEvent {
    pub fn new(query: &str, kind: EntityKind, result_count: u32, response_time_ms: f64) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            kind,
            result_count,
            response_time_ms: response_time_ms.max(0.0),
            client_ip: None,
            user_agent: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_client_ip(mut self, ip: Option<String>) -> Self {
        self.client_ip = ip;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<UserAgentInfo>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = at;
        self
    }
}

impl From<&SearchEvent> for NewSearchQueryRecord {
    fn from(event: &SearchEvent) -> Self {
        NewSearchQueryRecord {
            query: event.query.clone(),
            search_type: event.kind.as_str().to_string(),
            results_count: i32::try_from(event.result_count).unwrap_or(i32::MAX),
            response_time_ms: event.response_time_ms,
            user_ip: event.client_ip.clone(),
            user_agent: event
                .user_agent
                .as_ref()
                .and_then(|ua| serde_json::to_string(ua).ok()),
            searched_at: event.occurred_at.naive_utc(),
            created_at: Utc::now().naive_utc(),
        }
    }
}

impl TryFrom<SearchQueryRecord> for SearchEvent {
    type Error = String;

    fn try_from(record: SearchQueryRecord) -> Result<Self, Self::Error> {
        Ok(SearchEvent {
            kind: record.search_type.parse()?,
            query: record.query,
            result_count: u32::try_from(record.results_count).unwrap_or(0),
            response_time_ms: record.response_time_ms,
            client_ip: record.user_ip,
            user_agent: record
                .user_agent
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
            occurred_at: record.searched_at.and_utc(),
        })
    }
}
