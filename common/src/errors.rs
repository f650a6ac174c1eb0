//! Application error types.
//!
//! Every failure in the explorer is surfaced to the operator as-is; there is
//! no retry anywhere. The variants follow the error taxonomy of the tool:
//! the session could not be opened, a statement failed, or packaging the
//! export failed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Errors raised by the explorer core and the HTTP boundary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Unreachable host, TLS negotiation failure, rejected login or connect timeout.
    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    /// Malformed identifier, missing object, permission denial or a blocked drop.
    #[error("database query failed: {0}")]
    DatabaseQuery(String),

    /// CSV or zip serialization failed while building an export.
    #[error("export failed: {0}")]
    Export(String),

    /// Anything else that should never reach the operator.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable error code carried in the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseConnection(_) => "DATABASE_CONNECTION_ERROR",
            AppError::DatabaseQuery(_) => "DATABASE_QUERY_ERROR",
            AppError::Export(_) => "EXPORT_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseConnection(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseQuery(_) => StatusCode::BAD_REQUEST,
            AppError::Export(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::warn!(code = self.code(), error = %self, "request rejected");
        }
        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}
