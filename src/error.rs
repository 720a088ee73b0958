//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::services::{QueryFailed, WriteError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Validation errors
    ValidationError(String),

    // Ledger errors (read or write)
    LedgerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ValidationError(msg) => {
                tracing::warn!("Rejected request: {}", msg);
                (StatusCode::BAD_REQUEST, msg.as_str())
            }
            AppError::LedgerError(msg) => {
                tracing::error!("Ledger error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.as_str())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<QueryFailed> for AppError {
    fn from(err: QueryFailed) -> Self {
        AppError::LedgerError(err.to_string())
    }
}

impl From<WriteError> for AppError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Validation(msg) => AppError::ValidationError(msg),
            WriteError::WriteFailed(_) => AppError::LedgerError(err.to_string()),
        }
    }
}
