//! Structured subprocess invocation with explicit argument lists and a
//! hard timeout. No shell interpolation anywhere.

use kana_core::error::KanaError;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Run a CLI tool and return its stdout. Non-zero exit or timeout is an
/// `Integration` failure for the caller to soften into an apology.
pub(crate) async fn run_command(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Duration,
    label: &str,
) -> Result<String, KanaError> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    debug!("executing: {program} {}", args.join(" "));

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| {
            KanaError::Integration(format!("{label} timed out after {}s", timeout.as_secs()))
        })?
        .map_err(|e| KanaError::Integration(format!("failed to run {label}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(KanaError::Integration(format!(
            "{label} exited with {}: {stderr}",
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let out = run_command("echo", &["hello"], None, Duration::from_secs(5), "echo")
            .await
            .unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_integration_error() {
        let err = run_command("false", &[], None, Duration::from_secs(5), "false")
            .await
            .unwrap_err();
        assert!(matches!(err, KanaError::Integration(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_integration_error() {
        let err = run_command("sleep", &["5"], None, Duration::from_millis(50), "sleep")
            .await
            .unwrap_err();
        assert!(matches!(err, KanaError::Integration(_)));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_integration_error() {
        let err = run_command(
            "definitely-not-a-real-binary",
            &[],
            None,
            Duration::from_secs(1),
            "missing",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, KanaError::Integration(_)));
    }
}
