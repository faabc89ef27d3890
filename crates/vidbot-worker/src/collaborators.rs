//! Interfaces to the systems a preparation reports into.

use std::path::Path;

use async_trait::async_trait;

use vidbot_models::{ArtifactMetadata, DeliveredMedia, PreparationOutcome, RecordId, RequesterId};

use crate::error::WorkerResult;

/// Persistent store of prepared media.
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// True if an administrator has blocked this source.
    async fn is_blocked(&self, external_id: &str, source_url: &str) -> WorkerResult<bool>;

    /// Store metadata for a delivered artifact.
    async fn create_record(&self, metadata: &ArtifactMetadata) -> WorkerResult<RecordId>;

    /// Index a record under a normalised query.
    async fn link_query(&self, query_norm: &str, record: RecordId) -> WorkerResult<()>;
}

/// Hands a local artifact to the requester's platform.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(
        &self,
        requester: RequesterId,
        artifact: &Path,
        caption: &str,
    ) -> WorkerResult<DeliveredMedia>;
}

/// Tells the requester how a preparation ended. Called exactly once per job.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, requester: RequesterId, outcome: &PreparationOutcome) -> WorkerResult<()>;
}
