//! FFprobe inspection of a prepared artifact.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Technical facts about a video file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds, when the container reports one
    pub duration: Option<f64>,
    pub width: u32,
    pub height: u32,
    /// File size in bytes
    pub size: u64,
}

impl VideoInfo {
    /// Duration rounded to whole seconds.
    pub fn duration_seconds(&self) -> Option<u64> {
        self.duration.filter(|d| *d >= 0.0).map(|d| d.round() as u64)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a video file with ffprobe.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    Ok(VideoInfo {
        duration: probe.format.duration.as_deref().and_then(|d| d.parse().ok()),
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        size: probe
            .format
            .size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "format": {"duration": "31.480000", "size": "1048576"},
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "width": 720, "height": 1280}
            ]
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.width, 720);
        assert_eq!(info.height, 1280);
        assert_eq!(info.size, 1_048_576);
        assert_eq!(info.duration_seconds(), Some(31));
    }

    #[test]
    fn test_parse_probe_output_without_video() {
        let json = br#"{"format": {}, "streams": [{"codec_type": "audio"}]}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(MediaError::InvalidVideo(_))
        ));
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_video("/nonexistent/file.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
