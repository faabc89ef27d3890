//! Formatting, normalisation and URL helpers shared across crates.

use std::sync::OnceLock;

use regex::Regex;

/// Base of the canonical watch URL handed to the fetch tool.
const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// Shown when a duration is unknown or invalid.
const UNKNOWN_DURATION: &str = "?";

/// Shown when a view count is unknown.
const UNKNOWN_VIEWS: &str = "—";

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:v=|/shorts/|youtu\.be/)([A-Za-z0-9_-]{6,})")
            .expect("video id pattern is valid")
    })
}

fn first_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").expect("url pattern is valid"))
}

/// Canonical watch URL for a video id.
pub fn watch_url(external_id: &str) -> String {
    format!("{}{}", WATCH_URL_BASE, external_id)
}

/// Lower-case a query and collapse all whitespace runs into single spaces.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract a video id from free text containing a `v=`, `/shorts/` or
/// `youtu.be/` link.
pub fn extract_video_id(text: &str) -> Option<String> {
    video_id_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First http(s) URL in free text, without trailing punctuation.
pub fn extract_first_url(text: &str) -> Option<String> {
    first_url_regex()
        .find(text)
        .map(|m| m.as_str().trim_end_matches([')', '.', ',', ']', '>']).to_string())
}

/// Render a duration as `MM:SS` or `H:MM:SS`; unknown or negative
/// durations render as `?`.
pub fn format_duration(seconds: Option<i64>) -> String {
    let Some(seconds) = seconds.filter(|s| *s >= 0) else {
        return UNKNOWN_DURATION.to_string();
    };
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Render a view count compactly (`950`, `1.5K`, `2M`).
pub fn format_views(views: Option<u64>) -> String {
    let Some(views) = views else {
        return UNKNOWN_VIEWS.to_string();
    };
    if views < 1_000 {
        return views.to_string();
    }
    let (value, suffix) = if views < 1_000_000 {
        (views as f64 / 1_000.0, "K")
    } else {
        (views as f64 / 1_000_000.0, "M")
    };
    let rendered = format!("{:.1}", value);
    let rendered = rendered.strip_suffix(".0").unwrap_or(&rendered);
    format!("{}{}", rendered, suffix)
}

/// Truncate to at most `max_len` characters, ending with `...` when cut.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    if max_len <= 3 {
        return text.chars().take(max_len).collect();
    }
    let head: String = text.chars().take(max_len - 3).collect();
    format!("{}...", head.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Hello   world "), "hello world");
        assert_eq!(normalize_query("КОТ\tпадает\n"), "кот падает");
        assert_eq!(normalize_query("   "), "");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(None), "?");
        assert_eq!(format_duration(Some(-1)), "?");
        assert_eq!(format_duration(Some(59)), "00:59");
        assert_eq!(format_duration(Some(61)), "01:01");
        assert_eq!(format_duration(Some(309)), "05:09");
        assert_eq!(format_duration(Some(3601)), "1:00:01");
    }

    #[test]
    fn test_format_views() {
        assert_eq!(format_views(None), "—");
        assert_eq!(format_views(Some(950)), "950");
        assert_eq!(format_views(Some(1_000)), "1K");
        assert_eq!(format_views(Some(1_500)), "1.5K");
        assert_eq!(format_views(Some(2_000_000)), "2M");
        assert_eq!(format_views(Some(12_340_000)), "12.3M");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "he...");
        assert_eq!(truncate_text("hello", 3), "hel");
        assert_eq!(truncate_text("привет мир", 8), "приве...");
    }

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("look https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtube.com/shorts/AbC_12-xyz"),
            Some("AbC_12-xyz".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/abcdef1"),
            Some("abcdef1".to_string())
        );
        assert_eq!(extract_video_id("no link here"), None);
        assert_eq!(extract_video_id("https://youtu.be/abc"), None);
    }

    #[test]
    fn test_extract_first_url() {
        assert_eq!(
            extract_first_url("see (https://example.com/a)."),
            Some("https://example.com/a".to_string())
        );
        assert_eq!(extract_first_url("nothing"), None);
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("abc"), "https://www.youtube.com/watch?v=abc");
    }
}
