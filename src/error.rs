use crate::models::EntityKind;
use rocket::response::{Responder, Response};
use rocket::{Request, http::ContentType, http::Status};
use serde_json::json;
use std::io::Cursor;
use thiserror::Error;

/// Failures raised by the catalog layer (upstream client and lookups).
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u32 },
    #[error("upstream returned {status} for {url}")]
    Upstream { status: u16, url: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("failed to decode upstream payload: {0}")]
    Decode(String),
    #[error("failed to build upstream client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::Network(err.to_string())
    }
}

/// Failures raised while recomputing the stats snapshot.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("stats task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for StatsError {
    fn from(err: tokio::task::JoinError) -> Self {
        StatsError::Task(err.to_string())
    }
}

#[derive(Debug)]
pub enum ApiError {
    UpstreamError(String),
    DatabaseError(String),
    BadRequest(String),
    Validation { field: String, message: String },
    NotFound(String),
    InternalServerError(String),
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'static> {
        let (status, body) = match self {
            ApiError::UpstreamError(msg) => (
                Status::BadGateway,
                json!({ "success": false, "message": "Upstream error", "error": msg }),
            ),
            ApiError::DatabaseError(msg) => (
                Status::InternalServerError,
                json!({ "success": false, "message": "Database error", "error": msg }),
            ),
            ApiError::BadRequest(msg) => {
                (Status::BadRequest, json!({ "success": false, "message": msg }))
            }
            ApiError::Validation { field, message } => (
                Status::BadRequest,
                json!({ "success": false, "errors": { field: [message] } }),
            ),
            ApiError::NotFound(msg) => {
                (Status::NotFound, json!({ "success": false, "message": msg }))
            }
            ApiError::InternalServerError(msg) => (
                Status::InternalServerError,
                json!({ "success": false, "message": "Internal server error", "error": msg }),
            ),
        };

        let body = body.to_string();
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { kind, .. } => {
                ApiError::NotFound(format!("{} not found", kind.display_name()))
            }
            CatalogError::Upstream { .. } | CatalogError::Network(_) | CatalogError::Decode(_) => {
                ApiError::UpstreamError(err.to_string())
            }
            CatalogError::Client(msg) => ApiError::InternalServerError(msg),
        }
    }
}

impl From<StatsError> for ApiError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::Database(e) => ApiError::DatabaseError(e.to_string()),
            StatsError::Task(msg) => ApiError::InternalServerError(msg),
        }
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        ApiError::DatabaseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_not_found_maps_to_entity_message() {
        let err = CatalogError::NotFound {
            kind: EntityKind::Film,
            id: 9,
        };
        assert_eq!(err.to_string(), "film 9 not found");

        match ApiError::from(err) {
            ApiError::NotFound(msg) => assert_eq!(msg, "Film not found"),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn test_decode_failure_maps_to_upstream_error() {
        let err = CatalogError::Decode("missing field `uid`".to_string());
        assert!(matches!(ApiError::from(err), ApiError::UpstreamError(_)));
    }
}
