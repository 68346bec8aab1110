//! Error types for the Firestore SDK

/// Result type alias
pub type Result<T> = std::result::Result<T, FirestoreError>;

/// Firestore client errors
#[derive(Debug, thiserror::Error)]
pub enum FirestoreError {
    /// The remote API answered with a non-success status
    #[error("Firestore returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for FirestoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FirestoreError::Timeout(err.to_string())
        } else if err.is_decode() {
            FirestoreError::Decode(err.to_string())
        } else {
            FirestoreError::Transport(err.to_string())
        }
    }
}
