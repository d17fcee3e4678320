//! Execution gate: runs the persisted script and reports how it went.
//!
//! Nothing here is a pipeline error. A script that fails to launch, exits
//! non-zero or times out is a reported [`ExecutionOutcome`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info, warn};

/// What happened when the generated script was run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The script exited with status 0.
    Succeeded,
    /// The script ran and exited non-zero. `None` means killed by a signal.
    ScriptExecutionFailed { exit_code: Option<i32> },
    /// The interpreter could not be started.
    ScriptLaunchFailed { reason: String },
    /// The path failed validation and nothing was run.
    ScriptValidationFailed { reason: String },
    /// The script exceeded its time limit and was killed.
    ScriptTimedOut { after: Duration },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "script executed successfully"),
            Self::ScriptExecutionFailed { exit_code: Some(code) } => {
                write!(f, "script execution failed with exit code {code}")
            }
            Self::ScriptExecutionFailed { exit_code: None } => {
                write!(f, "script execution failed: terminated by signal")
            }
            Self::ScriptLaunchFailed { reason } => write!(f, "script could not be launched: {reason}"),
            Self::ScriptValidationFailed { reason } => write!(f, "script rejected: {reason}"),
            Self::ScriptTimedOut { after } => {
                write!(f, "script timed out after {}s", after.as_secs())
            }
        }
    }
}

/// Runs a persisted script.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    async fn execute(&self, path: &Path) -> ExecutionOutcome;
}

/// [`ScriptExecutor`] that runs `<interpreter> <path>` with inherited stdio.
#[derive(Debug, Clone)]
pub struct ExecutionGate {
    interpreter: String,
    extension: String,
    timeout: Option<Duration>,
}

impl ExecutionGate {
    /// `extension` is compared against the script path's extension; a
    /// leading dot is ignored.
    pub fn new(interpreter: impl Into<String>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            interpreter: interpreter.into(),
            extension: extension.trim_start_matches('.').to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that `path` is an existing file with the designated extension.
    /// Returns the absolute path on success.
    pub fn validate(&self, path: &Path) -> Result<PathBuf, String> {
        let path = std::path::absolute(path).map_err(|e| format!("cannot resolve {path:?}: {e}"))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext != self.extension {
            return Err(format!(
                "{} does not have the .{} extension",
                path.display(),
                self.extension
            ));
        }
        if !path.is_file() {
            return Err(format!("{} is not an existing file", path.display()));
        }
        Ok(path)
    }
}

#[async_trait]
impl ScriptExecutor for ExecutionGate {
    async fn execute(&self, path: &Path) -> ExecutionOutcome {
        let path = match self.validate(path) {
            Ok(p) => p,
            Err(reason) => {
                error!(path = %path.display(), %reason, "refusing to execute script");
                return ExecutionOutcome::ScriptValidationFailed { reason };
            }
        };

        info!(interpreter = %self.interpreter, path = %path.display(), "running script");

        let mut child = match Command::new(&self.interpreter)
            .arg(&path)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                error!(interpreter = %self.interpreter, error = %e, "failed to launch script");
                return ExecutionOutcome::ScriptLaunchFailed {
                    reason: format!("{}: {e}", self.interpreter),
                };
            }
        };

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(waited) => waited,
                Err(_) => {
                    let _ = child.kill().await;
                    warn!(path = %path.display(), timeout_secs = limit.as_secs(), "script timed out");
                    return ExecutionOutcome::ScriptTimedOut { after: limit };
                }
            },
            None => child.wait().await,
        };

        match waited {
            Ok(status) if status.success() => {
                info!(path = %path.display(), "script executed successfully");
                ExecutionOutcome::Succeeded
            }
            Ok(status) => {
                error!(path = %path.display(), exit_code = ?status.code(), "script execution failed");
                ExecutionOutcome::ScriptExecutionFailed {
                    exit_code: status.code(),
                }
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to wait on script");
                ExecutionOutcome::ScriptLaunchFailed {
                    reason: format!("failed to wait on script: {e}"),
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn zero_exit_succeeds() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "ok.sh", "exit 0\n");
        let outcome = ExecutionGate::new("sh", "sh").execute(&script).await;
        assert_eq!(outcome, ExecutionOutcome::Succeeded);
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported_with_code() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "fail.sh", "exit 3\n");
        let outcome = ExecutionGate::new("sh", "sh").execute(&script).await;
        assert_eq!(
            outcome,
            ExecutionOutcome::ScriptExecutionFailed { exit_code: Some(3) }
        );
        assert_eq!(outcome.to_string(), "script execution failed with exit code 3");
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn wrong_extension_is_rejected_without_running() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("ran");
        let script = write_script(&dir, "script.txt", &format!("touch {}\n", marker.display()));

        let outcome = ExecutionGate::new("sh", "sh").execute(&script).await;
        assert!(matches!(outcome, ExecutionOutcome::ScriptValidationFailed { .. }));
        assert!(!marker.exists(), "script must not run");
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let outcome = ExecutionGate::new("sh", ".sh")
            .execute(&dir.path().join("absent.sh"))
            .await;
        assert!(matches!(outcome, ExecutionOutcome::ScriptValidationFailed { .. }));
    }

    #[tokio::test]
    async fn missing_interpreter_is_launch_failure() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "ok.sh", "exit 0\n");
        let outcome = ExecutionGate::new("draftsman_no_such_interpreter", "sh")
            .execute(&script)
            .await;
        assert!(matches!(outcome, ExecutionOutcome::ScriptLaunchFailed { .. }));
    }

    #[tokio::test]
    async fn timeout_kills_slow_script() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "slow.sh", "sleep 60\n");
        let outcome = ExecutionGate::new("sh", "sh")
            .with_timeout(Some(Duration::from_secs(1)))
            .execute(&script)
            .await;
        assert_eq!(
            outcome,
            ExecutionOutcome::ScriptTimedOut {
                after: Duration::from_secs(1)
            }
        );
    }

    #[test]
    fn validate_returns_absolute_path() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "ok.sh", "exit 0\n");
        let validated = ExecutionGate::new("sh", "sh").validate(&script).unwrap();
        assert!(validated.is_absolute());
        assert_eq!(validated, script);
    }
}
