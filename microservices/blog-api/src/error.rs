//! Error types for the Blog API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sentinela_firestore_sdk::FirestoreError;
use serde_json::json;

use crate::store::StoreError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Blog API error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected client input; the message is shown to the caller as is
    #[error("{0}")]
    Validation(String),

    #[error("{action}: {source}")]
    Firestore {
        action: &'static str,
        #[source]
        source: FirestoreError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Wrap a Firestore failure with the action that was attempted
    pub fn firestore(action: &'static str) -> impl FnOnce(FirestoreError) -> Self {
        move |source| Error::Firestore { action, source }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "error": message})),
            )
                .into_response(),

            Error::Firestore { action, source } => {
                let (status, details) = match source {
                    FirestoreError::Upstream { status, body } => (
                        StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                        body,
                    ),
                    FirestoreError::Timeout(e) => (StatusCode::GATEWAY_TIMEOUT, e),
                    FirestoreError::Transport(e) | FirestoreError::Decode(e) => {
                        (StatusCode::BAD_GATEWAY, e)
                    }
                    FirestoreError::Config(e) => {
                        tracing::error!(error = %e, "Firestore client misconfigured");
                        (StatusCode::INTERNAL_SERVER_ERROR, e)
                    }
                };
                tracing::warn!(status = status.as_u16(), action, "Firestore proxy call failed");

                (status, Json(json!({"error": action, "details": details}))).into_response()
            }

            Error::Storage(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"success": false, "error": "Internal server error"})),
                )
                    .into_response()
            }
        }
    }
}
