//! Notifier that reports outcomes to the log.

use async_trait::async_trait;
use tracing::{info, warn};

use vidbot_models::{PreparationOutcome, RequesterId};

use crate::collaborators::Notifier;
use crate::error::WorkerResult;

/// Writes each outcome as a structured log line.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, requester: RequesterId, outcome: &PreparationOutcome) -> WorkerResult<()> {
        match outcome {
            PreparationOutcome::Success {
                metadata,
                record_id,
            } => info!(
                requester = %requester,
                record_id = %record_id,
                file_id = %metadata.file_id,
                title = %metadata.title,
                "Video ready"
            ),
            PreparationOutcome::Failure { kind, message } => warn!(
                requester = %requester,
                kind = %kind,
                "{}", message
            ),
        }
        Ok(())
    }
}
