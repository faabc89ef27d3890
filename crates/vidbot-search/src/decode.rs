//! Tolerant decoding of mirror payloads.
//!
//! Mirrors disagree on shapes: a result page may be an object with an
//! `items` array or a bare array, and each field may live under one of
//! several keys. Every field is read through an explicit fallback-key order
//! and yields `None` rather than failing. An item is only dropped when it has
//! no usable id or title; an unrecognised page shape decodes to an empty page.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use vidbot_models::SearchCandidate;

/// Keys holding the video id, in preference order.
const ID_KEYS: &[&str] = &["videoId", "id"];

/// Keys holding the thumbnail URL, in preference order.
const THUMBNAIL_KEYS: &[&str] = &["thumbnail", "thumbnailUrl"];

/// Keys holding the view count, in preference order.
const VIEW_KEYS: &[&str] = &["views", "viewCount"];

/// Keys holding the continuation cursor, in preference order.
const CURSOR_KEYS: &[&str] = &["nextpage", "nextPage", "continuation"];

/// Item types that represent a playable video.
const VIDEO_TYPES: &[&str] = &["video", "stream"];

fn url_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:[?&]v=|/shorts/)([A-Za-z0-9_-]{6,})").expect("url id pattern is valid")
    })
}

/// Why a single result item was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemParseError {
    #[error("item is not an object")]
    NotAnObject,

    #[error("item type {0:?} is not a video")]
    UnsupportedType(String),

    #[error("item has no usable id")]
    MissingId,

    #[error("item has no title")]
    MissingTitle,
}

/// One decoded result page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPage {
    /// Candidates in mirror order, ranked by position within the page
    pub candidates: Vec<SearchCandidate>,
    /// Continuation cursor, passed back verbatim to fetch the next page
    pub next_cursor: Option<Value>,
}

/// Metadata for a single video from the streams endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub video_id: String,
    pub title: String,
    pub duration_seconds: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub livestream: bool,
}

impl StreamInfo {
    /// Build a rank-1 candidate from the stream metadata.
    pub fn to_candidate(&self) -> SearchCandidate {
        SearchCandidate::new(&self.video_id, &self.title, 1)
            .with_duration(self.duration_seconds)
            .with_thumbnail(self.thumbnail_url.clone())
    }
}

/// Parse a duration given as integer seconds or as `MM:SS` / `HH:MM:SS`.
///
/// Negative numbers (mirrors use `-1` for live streams) and anything else
/// yield `None`.
pub fn parse_duration(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => parse_clock(s),
        _ => None,
    }
}

fn parse_clock(raw: &str) -> Option<u64> {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    if parts
        .iter()
        .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    let nums: Vec<u64> = parts
        .iter()
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<_>>()?;
    match nums.as_slice() {
        [minutes, seconds] => minutes.checked_mul(60)?.checked_add(*seconds),
        [hours, minutes, seconds] => hours
            .checked_mul(3600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(*seconds),
        _ => None,
    }
}

/// Parse a view count given as an integer or a numeric string.
pub fn parse_view_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    }
}

fn non_empty_str<'a>(item: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn first_str(item: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| non_empty_str(item, k))
        .map(String::from)
}

fn extract_id(item: &Map<String, Value>) -> Option<String> {
    if let Some(id) = first_str(item, ID_KEYS) {
        return Some(id);
    }
    let url = non_empty_str(item, "url")?;
    url_id_regex()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn extract_short_hint(item: &Map<String, Value>) -> Option<bool> {
    if let Some(flag) = item.get("isShort").and_then(Value::as_bool) {
        return Some(flag);
    }
    non_empty_str(item, "url")
        .filter(|url| url.contains("/shorts/"))
        .map(|_| true)
}

/// Decode a single result item into a candidate with the given rank.
pub fn decode_item(value: &Value, rank: u32) -> Result<SearchCandidate, ItemParseError> {
    let item = value.as_object().ok_or(ItemParseError::NotAnObject)?;

    if let Some(kind) = item.get("type").and_then(Value::as_str) {
        if !VIDEO_TYPES.contains(&kind) {
            return Err(ItemParseError::UnsupportedType(kind.to_string()));
        }
    }

    let external_id = extract_id(item).ok_or(ItemParseError::MissingId)?;
    let title = non_empty_str(item, "title").ok_or(ItemParseError::MissingTitle)?;

    let duration = item.get("duration").and_then(parse_duration);
    let views = VIEW_KEYS
        .iter()
        .find_map(|k| item.get(*k).and_then(parse_view_count));

    Ok(SearchCandidate::new(external_id, title, rank)
        .with_duration(duration)
        .with_views(views)
        .with_thumbnail(first_str(item, THUMBNAIL_KEYS))
        .with_short_hint(extract_short_hint(item)))
}

fn extract_cursor(payload: &Value) -> Option<Value> {
    let obj = payload.as_object()?;
    CURSOR_KEYS
        .iter()
        .find_map(|k| obj.get(*k))
        .filter(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
        .cloned()
}

/// Decode a search or next-page payload.
pub fn decode_page(payload: &Value) -> DecodedPage {
    let items = match payload {
        Value::Object(obj) => obj.get("items").and_then(Value::as_array),
        Value::Array(items) => Some(items),
        _ => None,
    };

    let Some(items) = items else {
        debug!(
            kind = value_kind(payload),
            "Unrecognised search payload shape, treating as empty"
        );
        return DecodedPage::default();
    };

    let mut candidates = Vec::with_capacity(items.len());
    for (idx, raw) in items.iter().enumerate() {
        match decode_item(raw, idx as u32 + 1) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => debug!(position = idx + 1, "Skipping search item: {}", e),
        }
    }

    DecodedPage {
        candidates,
        next_cursor: extract_cursor(payload),
    }
}

/// Decode a streams-endpoint payload.
pub fn decode_stream_info(payload: &Value, video_id: &str) -> Option<StreamInfo> {
    let obj = payload.as_object()?;
    let title = non_empty_str(obj, "title")?;
    Some(StreamInfo {
        video_id: video_id.to_string(),
        title: title.to_string(),
        duration_seconds: obj.get("duration").and_then(parse_duration),
        thumbnail_url: first_str(obj, &["thumbnailUrl", "thumbnail"]),
        livestream: obj
            .get("livestream")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
