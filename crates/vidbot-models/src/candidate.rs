//! Search candidate model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::utils::watch_url;

/// Duration ceiling (seconds) under which a candidate counts as short-form.
pub const DEFAULT_SHORT_FORM_SECONDS: u64 = 60;

/// A single video returned by a mirror search, normalised from whatever
/// shape the mirror answered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SearchCandidate {
    /// Mirror-assigned video identifier
    pub external_id: String,

    /// Video title (never empty)
    pub title: String,

    /// Duration in seconds, when the mirror reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,

    /// View count, when the mirror reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,

    /// Thumbnail URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Canonical watch URL for the fetch tool
    pub source_url: String,

    /// 1-based position within the aggregated result list
    pub rank: u32,

    /// Short-form hint (explicit flag or inferred from a `/shorts/` URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_short: Option<bool>,
}

impl SearchCandidate {
    /// Create a candidate with the canonical watch URL for `external_id`.
    pub fn new(external_id: impl Into<String>, title: impl Into<String>, rank: u32) -> Self {
        let external_id = external_id.into();
        Self {
            source_url: watch_url(&external_id),
            external_id,
            title: title.into(),
            duration_seconds: None,
            view_count: None,
            thumbnail_url: None,
            rank,
            is_short: None,
        }
    }

    /// Set the duration.
    pub fn with_duration(mut self, seconds: Option<u64>) -> Self {
        self.duration_seconds = seconds;
        self
    }

    /// Set the view count.
    pub fn with_views(mut self, views: Option<u64>) -> Self {
        self.view_count = views;
        self
    }

    /// Set the thumbnail URL.
    pub fn with_thumbnail(mut self, url: Option<String>) -> Self {
        self.thumbnail_url = url;
        self
    }

    /// Set the short-form hint.
    pub fn with_short_hint(mut self, is_short: Option<bool>) -> Self {
        self.is_short = is_short;
        self
    }

    /// Copy of this candidate carrying a different rank.
    pub fn reranked(&self, rank: u32) -> Self {
        Self {
            rank,
            ..self.clone()
        }
    }

    /// True if the candidate is flagged short or its known duration fits
    /// within `max_seconds`.
    pub fn is_short_form(&self, max_seconds: u64) -> bool {
        self.is_short == Some(true)
            || self.duration_seconds.is_some_and(|d| d <= max_seconds)
    }
}
