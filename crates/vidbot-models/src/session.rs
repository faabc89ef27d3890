//! Session token model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::SearchCandidate;

/// Short-lived opaque handle carrying a query and the candidates found for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// Opaque random token
    pub token: String,
    /// Query as typed
    pub query_text: String,
    /// Lower-cased, whitespace-collapsed query
    pub query_norm: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Candidates in rank order; replaced wholesale, never appended
    #[serde(default)]
    pub candidates: Vec<SearchCandidate>,
}

impl SessionToken {
    /// Check if the token has expired as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Check if the token has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Candidate with the given external id.
    pub fn candidate(&self, external_id: &str) -> Option<&SearchCandidate> {
        self.candidates.iter().find(|c| c.external_id == external_id)
    }
}
