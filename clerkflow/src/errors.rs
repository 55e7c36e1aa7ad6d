use crate::types::{Operation, Resource};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} {id} not found")]
    NotFound { resource: String, id: String },

    /// The resource exists but has no such operation
    #[error("The operation \"{operation}\" is not supported for resource \"{resource}\"")]
    UnsupportedOperation { resource: Resource, operation: Operation },

    /// A parameter the operation needs was not supplied
    #[error("Missing required parameter \"{name}\"")]
    MissingParameter { name: String },

    /// The Clerk API answered with an error, or could not be reached (`status` is `None`)
    #[error("Clerk API error: {message}")]
    ClerkApi { status: Option<StatusCode>, message: String },

    /// Processing one input item failed
    #[error("Item {index}: {source}")]
    ItemFailed {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } | Error::UnsupportedOperation { .. } | Error::MissingParameter { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            // Clerk's client errors are meaningful to the caller, everything else is a gateway failure
            Error::ClerkApi { status, .. } => match status {
                Some(status) if status.is_client_error() => *status,
                _ => StatusCode::BAD_GATEWAY,
            },
            Error::ItemFailed { source, .. } => source.status_code(),
            Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } => message.clone(),
            Error::ClerkApi { message, .. } => message.clone(),
            Error::ItemFailed { index, source } => format!("Item {index}: {}", source.user_message()),
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Message recorded for a failed item when processing continues past failures
    pub fn item_message(&self) -> String {
        match self {
            Error::ItemFailed { source, .. } => source.item_message(),
            other => other.user_message(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::ClerkApi { .. } | Error::ItemFailed { .. } => {
                tracing::warn!("Upstream error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } | Error::UnsupportedOperation { .. } | Error::MissingParameter { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
