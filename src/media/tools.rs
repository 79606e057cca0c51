//! External tool invocation.

use crate::error::{Result, VoicecastError};
use std::ffi::OsStr;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Run an external program to completion.
///
/// A missing executable maps to [`VoicecastError::ToolUnavailable`]. A non-zero
/// exit or timeout is turned into an error with `fail`, carrying the combined
/// stdout and stderr. The child is killed if this future is dropped.
pub async fn run_tool<I, S>(
    program: &str,
    args: I,
    timeout: Duration,
    fail: fn(String) -> VoicecastError,
) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Executing command: {:?}", command.as_std());

    let result = match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => result,
        Err(_) => {
            return Err(fail(format!(
                "{} timed out after {} seconds",
                program,
                timeout.as_secs()
            )))
        }
    };

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VoicecastError::ToolUnavailable(program.to_string()));
        }
        Err(e) => return Err(fail(format!("{} execution failed: {}", program, e))),
    };

    if !output.status.success() {
        return Err(fail(format!(
            "{} failed ({}): {}",
            program,
            output.status,
            combined_output(&output)
        )));
    }

    Ok(output)
}

/// Stdout and stderr of a finished process, joined and trimmed.
fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    [stdout.trim(), stderr.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check if an external tool is available.
pub async fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };

    run_tool(name, [version_arg], Duration::from_secs(10), |msg| {
        VoicecastError::ToolUnavailable(format!("installed but not working correctly: {}", msg))
    })
    .await
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_tool_is_unavailable() {
        let err = run_tool(
            "voicecast-definitely-not-installed",
            ["--version"],
            Duration::from_secs(5),
            VoicecastError::AcquisitionFailed,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, VoicecastError::ToolUnavailable(name) if name == "voicecast-definitely-not-installed"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_carries_output() {
        let err = run_tool(
            "sh",
            ["-c", "echo partial; echo broken >&2; exit 3"],
            Duration::from_secs(5),
            VoicecastError::TransformFailed,
        )
        .await
        .unwrap_err();

        match err {
            VoicecastError::TransformFailed(msg) => {
                assert!(msg.contains("partial"));
                assert!(msg.contains("broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_reported() {
        let err = run_tool(
            "sleep",
            ["5"],
            Duration::from_millis(100),
            VoicecastError::AcquisitionFailed,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, VoicecastError::AcquisitionFailed(msg) if msg.contains("timed out")));
    }
}
