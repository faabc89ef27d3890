//! yt-dlp command builder and a subprocess runner with a hard timeout.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Builder for a single yt-dlp download attempt.
#[derive(Debug, Clone)]
pub struct YtDlpCommand {
    url: String,
    format: String,
    max_filesize: String,
    merge_output_format: String,
    output_template: PathBuf,
}

impl YtDlpCommand {
    /// Create a command downloading `url` into `output_template`
    /// (a path containing `%(ext)s`).
    pub fn new(url: impl Into<String>, output_template: impl AsRef<Path>) -> Self {
        Self {
            url: url.into(),
            format: "best".to_string(),
            max_filesize: crate::ladder::DEFAULT_MAX_FILESIZE.to_string(),
            merge_output_format: "mp4".to_string(),
            output_template: output_template.as_ref().to_path_buf(),
        }
    }

    /// Set the format selector.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Set the size ceiling (yt-dlp syntax, e.g. `49M`).
    pub fn max_filesize(mut self, size: impl Into<String>) -> Self {
        self.max_filesize = size.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            self.url.clone().into(),
            "-f".into(),
            self.format.clone().into(),
            "--max-filesize".into(),
            self.max_filesize.clone().into(),
            "--merge-output-format".into(),
            self.merge_output_format.clone().into(),
            "--no-playlist".into(),
            "--no-warnings".into(),
            "-o".into(),
        ];
        args.push(self.output_template.clone().into_os_string());
        args
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Last non-empty line of stderr, else of stdout.
    pub fn last_error_line(&self) -> Option<&str> {
        last_line(&self.stderr).or_else(|| last_line(&self.stdout))
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

/// Run `program` with `args`, killing it if it outlives `timeout`.
pub async fn run_with_timeout<I, S>(
    program: &Path,
    args: I,
    timeout: Duration,
) -> MediaResult<ProcessOutput>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    debug!(
        program = %program.display(),
        args = ?args,
        "Running subprocess"
    );

    let child = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    // Dropping the wait future on timeout drops the child, which kills it.
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => {
            let output = output?;
            Ok(ProcessOutput {
                success: output.status.success(),
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
        Err(_) => {
            warn!(
                program = %program.display(),
                timeout_secs = timeout.as_secs_f64(),
                "Subprocess timed out, killing process"
            );
            Err(MediaError::Timeout(timeout.as_secs()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args_order() {
        let cmd = YtDlpCommand::new("https://www.youtube.com/watch?v=abc", "/tmp/x/yt-abc.%(ext)s")
            .format("best[height<=480]")
            .max_filesize("10M");
        let args: Vec<String> = cmd
            .build_args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            [
                "https://www.youtube.com/watch?v=abc",
                "-f",
                "best[height<=480]",
                "--max-filesize",
                "10M",
                "--merge-output-format",
                "mp4",
                "--no-playlist",
                "--no-warnings",
                "-o",
                "/tmp/x/yt-abc.%(ext)s",
            ]
        );
    }

    #[test]
    fn test_last_error_line_prefers_stderr() {
        let out = ProcessOutput {
            success: false,
            exit_code: Some(1),
            stdout: "progress\n".to_string(),
            stderr: "WARNING: x\nERROR: boom\n\n".to_string(),
        };
        assert_eq!(out.last_error_line(), Some("ERROR: boom"));

        let quiet = ProcessOutput {
            stderr: String::new(),
            ..out
        };
        assert_eq!(quiet.last_error_line(), Some("progress"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_output() {
        let out = run_with_timeout(Path::new("sh"), ["-c", "echo hi; echo oops >&2; exit 3"], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout.trim(), "hi");
        assert_eq!(out.last_error_line(), Some("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_times_out() {
        let err = run_with_timeout(Path::new("sh"), ["-c", "sleep 5"], Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Timeout(_)));
    }
}
