//! Search error types.

use thiserror::Error;

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur while selecting a backend or running a search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("No search backend answered the probe: {0}")]
    BackendUnavailable(String),

    #[error("Search configuration error: {0}")]
    Config(String),

    #[error("Backend returned HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl SearchError {
    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// True for transport, status and decode faults on a real query.
    ///
    /// These are the errors a caller may degrade to an empty result set.
    pub fn is_backend_error(&self) -> bool {
        matches!(
            self,
            SearchError::Status(_, _)
                | SearchError::InvalidResponse(_)
                | SearchError::Network(_)
        )
    }

    /// Check if the operation may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        self.is_backend_error() || matches!(self, SearchError::BackendUnavailable(_))
    }

    /// HTTP status code, if the error carries one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            SearchError::Status(code, _) => Some(*code),
            SearchError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_are_retryable() {
        assert!(SearchError::Status(502, "bad gateway".into()).is_retryable());
        assert!(SearchError::invalid_response("not json").is_retryable());
        assert!(SearchError::Status(500, "oops".into()).is_backend_error());
    }

    #[test]
    fn test_unavailable_is_not_a_search_backend_error() {
        let err = SearchError::backend_unavailable("all probes failed");
        assert!(!err.is_backend_error());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_config_error_not_retryable() {
        assert!(!SearchError::config("missing url").is_retryable());
    }

    #[test]
    fn test_http_status_getter() {
        assert_eq!(SearchError::Status(503, "x".into()).http_status(), Some(503));
        assert_eq!(SearchError::invalid_response("x").http_status(), None);
    }
}
