use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error as ThisError;

use super::ValidationError;

#[derive(Debug, ThisError)]
pub enum RegistryError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The engine rejected the statement; `message` is the engine's text verbatim.
    #[error("{message}")]
    Query { message: String },

    #[error("Empty query")]
    EmptyQuery,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage closed")]
    StorageClosed,

    #[error("Row decode error: {0}")]
    RowDecode(#[from] serde_json::Error),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for RegistryError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) => RegistryError::Query {
                message: db.message().to_string(),
            },
            other => RegistryError::DatabaseError(other),
        }
    }
}

impl RegistryError {
    /// Errors the user can fix by editing input and resubmitting.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            RegistryError::Validation(_) | RegistryError::Query { .. } | RegistryError::EmptyQuery
        )
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            RegistryError::Validation(e) => {
                let status = StatusCode::UNPROCESSABLE_ENTITY;
                let body = ApiErrorObject {
                    code: "VALIDATION_ERROR".to_string(),
                    message: e.to_string(),
                };
                (status, body)
            }

            RegistryError::Query { message } => {
                let status = StatusCode::BAD_REQUEST;
                let body = ApiErrorObject {
                    code: "QUERY_ERROR".to_string(),
                    message,
                };
                (status, body)
            }

            RegistryError::EmptyQuery => {
                let status = StatusCode::BAD_REQUEST;
                let body = ApiErrorObject {
                    code: "EMPTY_QUERY".to_string(),
                    message: "Query text is empty.".to_string(),
                };
                (status, body)
            }

            RegistryError::StorageUnavailable(_)
            | RegistryError::StorageClosed
            | RegistryError::RowDecode(_)
            | RegistryError::RactorError(_)
            | RegistryError::DatabaseError(_) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorObject {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal error occurred.".to_string(),
                };
                (status, body)
            }
        };
        (status, Json(ApiErrorBody { error: error_body })).into_response()
    }
}

/// Standardized API error object.
#[derive(Debug, Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorObject,
}
