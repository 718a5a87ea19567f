use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use sitegrade_db::StoreError;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown domain {0}")]
    UnknownDomain(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::UnknownDomain(domain) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "unknown domain", "domain": domain })),
            )
                .into_response(),
            // Handlers that look up by key turn NotFound into their own variant;
            // this covers any that pass it through.
            ApiError::Store(StoreError::NotFound) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "not found" })),
            )
                .into_response(),
            ApiError::Store(e) => {
                error!("Store failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal store error" })),
                )
                    .into_response()
            }
        }
    }
}
