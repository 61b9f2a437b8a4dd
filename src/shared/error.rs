use axum::{http::StatusCode, response::IntoResponse, Json};
use log::{error, warn};

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_logged_in() -> Self {
        Self::Unauthorized("User not logged in".to_string())
    }

    /// Prefixes the aggregation stage that failed.
    pub fn in_stage(self, stage: &str) -> Self {
        match self {
            Self::Query(msg) => Self::Query(format!("{stage}: {msg}")),
            Self::Internal(msg) => Self::Internal(format!("{stage}: {msg}")),
            other => other,
        }
    }

    /// The text shown to clients, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Unauthorized(msg)
            | Self::Query(msg)
            | Self::Internal(msg) => msg,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Query(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Conflict(what) => Self::Conflict(what),
            other => Self::Query(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = self.message().to_string();

        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("{self}");
        }

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            ApiError::from(StoreError::NotFound("Quiz 1".into())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Conflict("dup".into())),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Timeout(10)),
            ApiError::Query(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Unavailable("pool".into())),
            ApiError::Query(_)
        ));
    }

    #[test]
    fn test_stage_context() {
        let err = ApiError::Query("connection reset".into()).in_stage("statistics join");
        assert_eq!(err.to_string(), "Query error: statistics join: connection reset");
        let not_found = ApiError::NotFound("Quiz".into()).in_stage("quiz");
        assert_eq!(not_found.to_string(), "Not found: Quiz");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::not_logged_in().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Query("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
