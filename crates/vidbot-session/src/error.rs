//! Session error types.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors returned by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session token not found: {0}")]
    TokenNotFound(String),

    #[error("Session token expired: {0}")]
    TokenExpired(String),
}

impl SessionError {
    pub fn not_found(token: impl Into<String>) -> Self {
        Self::TokenNotFound(token.into())
    }

    pub fn expired(token: impl Into<String>) -> Self {
        Self::TokenExpired(token.into())
    }

    /// True when the token cannot be used, whether it never existed or has
    /// lapsed. Callers that do not distinguish the two treat both as not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::TokenNotFound(_) | SessionError::TokenExpired(_))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, SessionError::TokenExpired(_))
    }
}
