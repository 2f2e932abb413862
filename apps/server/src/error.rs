// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types and handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Empty request body")]
    MissingBody,

    #[error("Request too large: maximum size is {max_mb} MB")]
    FileTooLarge { max_mb: usize },

    #[error("Invalid circuit description: {0}")]
    InvalidCircuit(String),

    #[error("Conversion error: {0}")]
    Processing(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Join error")]
    Join(#[from] tokio::task::JoinError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::MissingBody => (StatusCode::BAD_REQUEST, "MISSING_BODY"),
            ApiError::FileTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE"),
            ApiError::InvalidCircuit(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_CIRCUIT"),
            ApiError::Processing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_ERROR"),
            ApiError::Cache(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Join(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TASK_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<pcb3d_core::Error> for ApiError {
    fn from(err: pcb3d_core::Error) -> Self {
        ApiError::InvalidCircuit(err.to_string())
    }
}

impl From<pcb3d_processing::Error> for ApiError {
    fn from(err: pcb3d_processing::Error) -> Self {
        ApiError::Processing(err.to_string())
    }
}

impl From<cacache::Error> for ApiError {
    fn from(err: cacache::Error) -> Self {
        ApiError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_errors_are_client_errors() {
        let err: ApiError = pcb3d_core::CircuitJson::from_json_str("{}").unwrap_err().into();
        assert_eq!(err.status_and_code(), (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_CIRCUIT"));
    }

    #[test]
    fn test_fetch_failure_is_processing_error() {
        let err: ApiError = pcb3d_processing::Error::fetch("a.stl", "404").into();
        assert_eq!(err.status_and_code().1, "PROCESSING_ERROR");
        assert!(err.to_string().contains("a.stl"));
    }
}
