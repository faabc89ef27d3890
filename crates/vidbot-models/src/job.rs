//! Preparation job models.
//!
//! Jobs are memory-resident: they exist from admission until a terminal
//! status and are never persisted.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::candidate::SearchCandidate;
use crate::utils::watch_url;

/// Unique identifier for a preparation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of whoever asked for a preparation (a chat or user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RequesterId(pub i64);

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RequesterId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Key identifying "this requester preparing this specific video".
///
/// At most one job may hold a given key at any instant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    /// Build the key from the requester and the source identity.
    ///
    /// The source URL is preferred; the bare external id is used when no
    /// URL is known yet.
    pub fn for_source(requester: RequesterId, source: &str) -> Self {
        Self(format!("{}:{}", requester, source))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Preparation job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted by the admission gate, waiting for a permit
    #[default]
    Admitted,
    /// Holding a permit and doing real work
    Running,
    /// Finished with an artifact
    Done,
    /// Finished without an artifact
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Admitted => "admitted",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything a preparation run needs to know about its request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparationJob {
    /// Job identifier (for logs)
    pub job_id: JobId,
    /// Who asked
    pub requester: RequesterId,
    /// Video identifier at the mirror
    pub external_id: String,
    /// URL handed to the fetch tool
    pub source_url: String,
    /// Cached candidate, when the request came from a search result
    pub candidate: Option<SearchCandidate>,
    /// Normalised query to index the result under
    pub query_norm: Option<String>,
    /// Current status
    #[serde(default)]
    pub status: JobStatus,
}

impl PreparationJob {
    /// Create a job for a bare video id.
    pub fn new(requester: RequesterId, external_id: impl Into<String>) -> Self {
        let external_id = external_id.into();
        Self {
            job_id: JobId::new(),
            requester,
            source_url: watch_url(&external_id),
            external_id,
            candidate: None,
            query_norm: None,
            status: JobStatus::Admitted,
        }
    }

    /// Create a job from a search candidate.
    pub fn from_candidate(requester: RequesterId, candidate: SearchCandidate) -> Self {
        Self {
            job_id: JobId::new(),
            requester,
            external_id: candidate.external_id.clone(),
            source_url: candidate.source_url.clone(),
            candidate: Some(candidate),
            query_norm: None,
            status: JobStatus::Admitted,
        }
    }

    /// Attach the normalised query the result should be indexed under.
    pub fn with_query(mut self, query_norm: Option<String>) -> Self {
        self.query_norm = query_norm.filter(|q| !q.is_empty());
        self
    }

    /// Override the source URL (e.g. a link pasted by the requester).
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = url.into();
        self
    }

    /// Dedup key for this job.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::for_source(self.requester, &self.source_url)
    }

    /// Title to show for the artifact.
    pub fn title(&self) -> &str {
        self.candidate
            .as_ref()
            .map(|c| c.title.as_str())
            .unwrap_or("Video")
    }

    /// Known duration, if the job came from a candidate.
    pub fn known_duration(&self) -> Option<u64> {
        self.candidate.as_ref().and_then(|c| c.duration_seconds)
    }

    /// Prefix for files the fetch tool writes for this job.
    pub fn file_prefix(&self) -> String {
        let id = if self.external_id.is_empty() {
            "media"
        } else {
            self.external_id.as_str()
        };
        format!("yt-{}", id)
    }
}
