//! Model invoker: one blocking prompt/response round trip with a local
//! model runner subprocess.
//!
//! The runner is launched as `<runner> run <model>`, the prompt is written
//! to its stdin, and its complete stdout is taken as the response once the
//! process exits. Stderr is forwarded to the log only; the exit code alone
//! decides success.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Failures talking to the model runner. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("model runner {binary:?} not found -- is it installed and on PATH?")]
    ToolNotFound { binary: String },

    #[error("model runner exited with {}", describe_exit(*exit_code))]
    ToolExecutionFailed {
        /// `None` when the runner was terminated by a signal.
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("model runner I/O failure: {context}")]
    ToolIoFailed {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl InvokeError {
    fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::ToolIoFailed {
            context: context.into(),
            source,
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// A prompt-in, text-out model backend.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Send `prompt` to `model` and return the full response, trimmed.
    async fn invoke(&self, prompt: &str, model: &str) -> Result<String, InvokeError>;
}

/// [`ModelInvoker`] backed by a runner executable such as `ollama`.
#[derive(Debug, Clone)]
pub struct SubprocessInvoker {
    runner_binary: String,
    timeout: Option<Duration>,
}

impl SubprocessInvoker {
    pub fn new(runner_binary: impl Into<String>) -> Self {
        Self {
            runner_binary: runner_binary.into(),
            timeout: None,
        }
    }

    /// Kill the runner and fail with [`InvokeError::ToolIoFailed`] if a
    /// round trip takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn runner_binary(&self) -> &str {
        &self.runner_binary
    }

    async fn round_trip(&self, prompt: &str, model: &str) -> Result<String, InvokeError> {
        let mut child = Command::new(&self.runner_binary)
            .arg("run")
            .arg(model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => InvokeError::ToolNotFound {
                    binary: self.runner_binary.clone(),
                },
                _ => InvokeError::io(
                    format!("failed to spawn {:?}", self.runner_binary),
                    e,
                ),
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| InvokeError::io("runner stdin not captured", io::ErrorKind::BrokenPipe.into()))?;

        // Feed stdin while draining stdout/stderr so a long prompt cannot
        // deadlock against a full output pipe.
        let feed = async move {
            stdin.write_all(prompt.as_bytes()).await?;
            stdin.shutdown().await
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|e| InvokeError::io("failed to wait on model runner", e))?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stderr.is_empty() {
            debug!(runner = %self.runner_binary, %stderr, "model runner stderr");
        }

        if !output.status.success() {
            warn!(
                runner = %self.runner_binary,
                model,
                exit_code = ?output.status.code(),
                "model runner failed"
            );
            return Err(InvokeError::ToolExecutionFailed {
                exit_code: output.status.code(),
                stderr,
            });
        }

        match fed {
            Ok(()) => {}
            // The runner exited cleanly without draining its input.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!(runner = %self.runner_binary, "model runner closed stdin early");
            }
            Err(e) => return Err(InvokeError::io("failed to write prompt to model runner", e)),
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl ModelInvoker for SubprocessInvoker {
    async fn invoke(&self, prompt: &str, model: &str) -> Result<String, InvokeError> {
        debug!(
            runner = %self.runner_binary,
            model,
            prompt_bytes = prompt.len(),
            "invoking model runner"
        );

        let Some(limit) = self.timeout else {
            return self.round_trip(prompt, model).await;
        };

        // Dropping the round-trip future drops the child, and kill_on_drop
        // reaps it.
        match tokio::time::timeout(limit, self.round_trip(prompt, model)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(runner = %self.runner_binary, model, timeout_secs = limit.as_secs(), "model runner timed out");
                Err(InvokeError::io(
                    format!("model runner timed out after {}s", limit.as_secs()),
                    io::ErrorKind::TimedOut.into(),
                ))
            }
        }
    }
}
