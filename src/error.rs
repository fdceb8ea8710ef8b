//! Error types for the document bridge.

use crate::handlers::document::diagnosis::{classify, StoreFailure};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for bridge operations
#[derive(Debug, Error)]
pub enum Error {
    /// Caller input is missing or malformed; never reaches the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store endpoint unreachable, rejected credentials or timed out
    #[error("Connection error: {0}")]
    Connection(StoreFailure),

    /// Store rejected an otherwise valid operation
    #[error("Operation error: {0}")]
    Operation(StoreFailure),

    /// HTTP verb not supported by the bridge
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status reported for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Error::Connection(_)
            | Error::Operation(_)
            | Error::Config(_)
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short category name used in response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Connection(_) => "connection",
            Error::Operation(_) => "operation",
            Error::MethodNotAllowed(_) => "method_not_allowed",
            Error::Config(_) => "configuration",
            Error::Io(_) => "io",
        }
    }

    /// Underlying store failure, if the error came from the store
    pub fn store_failure(&self) -> Option<&StoreFailure> {
        match self {
            Error::Connection(failure) | Error::Operation(failure) => Some(failure),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self.store_failure() {
            Some(failure) => json!({
                "error": true,
                "kind": self.kind(),
                "type": failure.name,
                "msg": failure.message,
                "diagnosis": classify(failure),
            }),
            None => json!({
                "error": true,
                "kind": self.kind(),
                "msg": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
