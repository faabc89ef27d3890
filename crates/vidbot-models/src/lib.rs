//! Shared data models for the vidbot core.
//!
//! This crate provides Serde-serializable types for:
//! - Search candidates returned by mirror backends
//! - Session tokens bridging a search to a later preparation request
//! - Preparation jobs, their dedup keys and outcomes
//! - Formatting and normalisation helpers shared by every crate

pub mod candidate;
pub mod job;
pub mod outcome;
pub mod session;
pub mod utils;

// Re-export common types
pub use candidate::{SearchCandidate, DEFAULT_SHORT_FORM_SECONDS};
pub use job::{DedupKey, JobId, JobStatus, PreparationJob, RequesterId};
pub use outcome::{ArtifactMetadata, DeliveredMedia, FailureKind, PreparationOutcome, RecordId};
pub use session::SessionToken;
pub use utils::{
    extract_first_url, extract_video_id, format_duration, format_views, normalize_query,
    truncate_text, watch_url,
};
