//! API error mapping
//!
//! Component errors convert into [`ApiError`] once, here, and render as
//! `{error, detail}` JSON bodies with the matching HTTP status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::ingestion::IngestError;
use crate::rag::RagError;
use crate::tenants::TenantError;
use crate::vector::VectorStoreError;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn to_response(&self) -> ErrorResponse {
        let (error, detail) = match self {
            ApiError::NotFound(detail) => ("not_found", detail.clone()),
            ApiError::InvalidRequest(detail) => ("invalid_request", detail.clone()),
            ApiError::Internal(detail) => ("internal_error", detail.clone()),
        };
        ErrorResponse {
            error: error.to_string(),
            detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), axum::Json(self.to_response())).into_response()
    }
}

impl From<TenantError> for ApiError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::NotFound(_) => ApiError::NotFound("Tenant not found".to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        if err.is_client_error() {
            ApiError::InvalidRequest(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<VectorStoreError> for ApiError {
    fn from(err: VectorStoreError) -> Self {
        ApiError::Internal(format!("Knowledge base error: {err}"))
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match &err {
            RagError::ContextRetrieval | RagError::VectorStore(_) => {
                ApiError::Internal(format!("Knowledge base error: {err}"))
            }
            RagError::ResponseGeneration | RagError::Completion(_) => {
                ApiError::Internal(format!("Response generation error: {err}"))
            }
        }
    }
}
