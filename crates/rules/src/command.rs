//! External command execution.
//!
//! Rules are backed by shell commands. [`CommandRunner`] is the seam between
//! rule evaluation and the operating system; [`ShellRunner`] runs commands via
//! `/bin/sh -c` in a fixed working directory with a wall-clock timeout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Output of a command that exited 0 with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Human-readable reason for a non-zero exit.
    pub fn failure_message(&self) -> String {
        let status = match self.exit_code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        };
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("Command {status}")
        } else {
            format!("Command {status}: {stderr}")
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to spawn command: {0}")]
    Spawn(String),
    #[error("command execution error: {0}")]
    Io(String),
    #[error("command timed out after {0:?}")]
    Timeout(Duration),
}

/// Runs an external command to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, timeout: Duration) -> Result<CommandOutput, RunError>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    working_dir: PathBuf,
}

impl ShellRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, timeout: Duration) -> Result<CommandOutput, RunError> {
        debug!(
            command = command,
            timeout_ms = timeout.as_millis() as u64,
            working_dir = %self.working_dir.display(),
            "executing rule command"
        );

        // kill_on_drop: a timed-out child is killed when the future is dropped.
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunError::Spawn(e.to_string()))?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(RunError::Io(e.to_string())),
            Err(_) => {
                warn!(command = command, timeout_ms = timeout.as_millis() as u64, "command timed out");
                return Err(RunError::Timeout(timeout));
            }
        };

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            debug!(exit_code = ?result.exit_code, "command returned non-zero exit code");
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> ShellRunner {
        ShellRunner::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn captures_stdout() {
        let out = runner()
            .run("echo hello", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn captures_stderr_and_exit_code() {
        let out = runner()
            .run("echo broken >&2; exit 3", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!out.success());
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stderr.trim(), "broken");
        assert_eq!(out.failure_message(), "Command exited with status 3: broken");
    }

    #[tokio::test]
    async fn times_out_long_commands() {
        let err = runner()
            .run("sleep 5", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Timeout(_)));
    }

    #[tokio::test]
    async fn missing_working_dir_fails_to_spawn() {
        let err = ShellRunner::new("/definitely/not/a/dir")
            .run("true", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Spawn(_)));
    }

    #[test]
    fn failure_message_without_stderr() {
        let out = CommandOutput {
            exit_code: Some(1),
            ..Default::default()
        };
        assert_eq!(out.failure_message(), "Command exited with status 1");
    }
}
