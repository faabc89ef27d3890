//! Local outbox delivery.
//!
//! Copies the artifact into a per-requester outbox directory with a caption
//! sidecar, and reports dimensions from ffprobe when it is installed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use vidbot_media::{probe_video, MediaError};
use vidbot_models::{DeliveredMedia, RequesterId};

use crate::collaborators::Delivery;
use crate::error::{WorkerError, WorkerResult};

/// Delivers artifacts by copying them into `<dir>/<requester>/`.
pub struct OutboxDelivery {
    dir: PathBuf,
}

impl OutboxDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding deliveries for `requester`.
    pub fn requester_dir(&self, requester: RequesterId) -> PathBuf {
        self.dir.join(requester.to_string())
    }
}

#[async_trait]
impl Delivery for OutboxDelivery {
    async fn deliver(
        &self,
        requester: RequesterId,
        artifact: &Path,
        caption: &str,
    ) -> WorkerResult<DeliveredMedia> {
        let file_id = Uuid::new_v4().to_string();
        let file_unique_id = file_id.split('-').next().unwrap_or(&file_id).to_string();

        let target_dir = self.requester_dir(requester);
        tokio::fs::create_dir_all(&target_dir).await?;

        let ext = artifact
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let target = target_dir.join(format!("{}.{}", file_id, ext));

        let size = tokio::fs::copy(artifact, &target)
            .await
            .map_err(|e| WorkerError::delivery_failed(format!("copy to {}: {}", target.display(), e)))?;
        tokio::fs::write(target.with_extension("txt"), caption).await?;

        let info = match probe_video(&target).await {
            Ok(info) => Some(info),
            Err(MediaError::FfprobeNotFound) => {
                warn!("ffprobe not installed, delivering without dimensions");
                None
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&target).await;
                return Err(WorkerError::delivery_failed(format!("not a playable video: {}", e)));
            }
        };

        info!(
            requester = %requester,
            path = %target.display(),
            size_bytes = size,
            "Delivered artifact to outbox"
        );

        Ok(DeliveredMedia {
            file_id,
            file_unique_id,
            duration_seconds: info.as_ref().and_then(|i| i.duration_seconds()),
            width: info.as_ref().map(|i| i.width),
            height: info.as_ref().map(|i| i.height),
            size_bytes: Some(size),
        })
    }
}
