//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Preparation already in progress: {0}")]
    AlreadyInProgress(String),

    #[error("Library operation failed: {0}")]
    LibraryFailed(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] vidbot_media::MediaError),

    #[error("Search error: {0}")]
    Search(#[from] vidbot_search::SearchError),

    #[error("Session error: {0}")]
    Session(#[from] vidbot_session::SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn already_in_progress(key: impl Into<String>) -> Self {
        Self::AlreadyInProgress(key.into())
    }

    pub fn library_failed(msg: impl Into<String>) -> Self {
        Self::LibraryFailed(msg.into())
    }

    pub fn delivery_failed(msg: impl Into<String>) -> Self {
        Self::DeliveryFailed(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::DeliveryFailed(_) | WorkerError::Io(_) => true,
            WorkerError::Media(e) => e.is_retryable(),
            WorkerError::Search(e) => e.is_retryable(),
            _ => false,
        }
    }
}
