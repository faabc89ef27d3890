//! Preparation outcomes and artifact metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::job::RequesterId;

/// Identifier assigned by the media library to a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the delivery collaborator hands back after accepting an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredMedia {
    /// Platform-assigned handle for re-sending the media
    pub file_id: String,
    /// Platform-assigned stable handle
    pub file_unique_id: String,
    pub duration_seconds: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size_bytes: Option<u64>,
}

/// Technical and descriptive metadata of a prepared artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub file_id: String,
    pub file_unique_id: String,
    pub external_id: String,
    pub source_url: String,
    pub title: String,
    pub duration_seconds: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size_bytes: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub requester: RequesterId,
}

impl ArtifactMetadata {
    /// Combine what delivery reported with the descriptive fields of the job.
    pub fn from_delivery(
        media: DeliveredMedia,
        external_id: impl Into<String>,
        source_url: impl Into<String>,
        title: impl Into<String>,
        thumbnail_url: Option<String>,
        requester: RequesterId,
    ) -> Self {
        Self {
            file_id: media.file_id,
            file_unique_id: media.file_unique_id,
            external_id: external_id.into(),
            source_url: source_url.into(),
            title: title.into(),
            duration_seconds: media.duration_seconds,
            width: media.width,
            height: media.height,
            size_bytes: media.size_bytes,
            thumbnail_url,
            requester,
        }
    }
}

/// Classified reason a preparation did not produce an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The source requires age/consent verification
    AgeRestricted,
    /// Every format rung failed
    DownloadFailed,
    /// The source is longer than the clip ceiling
    TooLong,
    /// The library has blocked this source
    Blocked,
    /// The artifact could not be handed to the delivery collaborator
    DeliveryFailed,
    /// Unexpected failure caught at the task boundary
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::AgeRestricted => "age_restricted",
            FailureKind::DownloadFailed => "download_failed",
            FailureKind::TooLong => "too_long",
            FailureKind::Blocked => "blocked",
            FailureKind::DeliveryFailed => "delivery_failed",
            FailureKind::Internal => "internal",
        }
    }

    /// Fixed message shown to the requester for this kind.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::AgeRestricted => {
                "This video is age-restricted and cannot be prepared, pick another one."
            }
            FailureKind::DownloadFailed => "Could not download the video.",
            FailureKind::TooLong => "The video is longer than the allowed clip length, pick another one.",
            FailureKind::Blocked => "This video has been blocked by an administrator, pick another one.",
            FailureKind::DeliveryFailed => {
                "Could not send the video in the required format. Please try again."
            }
            FailureKind::Internal => "Could not prepare the video. Please try again later.",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal result of one preparation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreparationOutcome {
    Success {
        metadata: ArtifactMetadata,
        record_id: RecordId,
    },
    Failure {
        kind: FailureKind,
        message: String,
    },
}

impl PreparationOutcome {
    /// Build a failure carrying the fixed user message for `kind`.
    pub fn failure(kind: FailureKind) -> Self {
        Self::Failure {
            kind,
            message: kind.user_message().to_string(),
        }
    }

    /// Build a failure with a custom message.
    pub fn failure_with(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PreparationOutcome::Success { .. })
    }

    /// Failure kind, if this is a failure.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            PreparationOutcome::Failure { kind, .. } => Some(*kind),
            PreparationOutcome::Success { .. } => None,
        }
    }

    /// Label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            PreparationOutcome::Success { .. } => "success",
            PreparationOutcome::Failure { kind, .. } => kind.as_str(),
        }
    }
}
