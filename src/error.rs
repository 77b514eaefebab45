use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{auth::AccessError, ledger::StoreError, nutrition::EstimateError};

/// Error surfaced by JSON handlers as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    UpstreamMalformed(String),
    #[error("Not authenticated with Google")]
    NotAuthenticated,
    #[error("Spreadsheet is not configured")]
    NotConfigured,
    #[error("{0:#}")]
    Remote(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotAuthenticated | ApiError::NotConfigured => StatusCode::UNAUTHORIZED,
            ApiError::UpstreamMalformed(_) | ApiError::Remote(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotAuthenticated => ApiError::NotAuthenticated,
            StoreError::NotConfigured => ApiError::NotConfigured,
            e @ StoreError::InvalidRow(_) => ApiError::Validation(e.to_string()),
            StoreError::Remote(e) => ApiError::Remote(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<AccessError> for ApiError {
    fn from(e: AccessError) -> Self {
        StoreError::from(e).into()
    }
}

impl From<EstimateError> for ApiError {
    fn from(e: EstimateError) -> Self {
        match e {
            EstimateError::MissingInput => {
                ApiError::Validation("Food description or image is required".into())
            }
            EstimateError::Malformed(msg) => ApiError::UpstreamMalformed(msg),
            EstimateError::Upstream(e) => ApiError::Remote(e),
        }
    }
}
