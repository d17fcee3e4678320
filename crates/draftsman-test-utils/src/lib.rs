//! Shared test doubles for draftsman integration tests.
//!
//! - [`ScriptedInvoker`] replays canned model replies and records prompts.
//! - [`ScriptedApproval`] answers gates from a fixed list.
//! - [`RecordingExecutor`] records which scripts it was asked to run.
//! - [`CapturingReporter`] keeps every displayed artifact.
//! - [`write_stub_runner`] writes an executable `sh` script that stands in
//!   for a model runner or interpreter.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use draftsman_core::approval::{ApprovalSource, Checkpoint};
use draftsman_core::exec::{ExecutionOutcome, ScriptExecutor};
use draftsman_core::invoker::{InvokeError, ModelInvoker};
use draftsman_core::report::Reporter;

// ---------------------------------------------------------------------------
// Model invoker
// ---------------------------------------------------------------------------

/// Canned reply for one [`ScriptedInvoker`] call.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    NotFound,
    ExitCode(i32),
    IoFailure,
}

impl Reply {
    fn into_result(self, binary: &str) -> Result<String, InvokeError> {
        match self {
            Reply::Text(text) => Ok(text.trim().to_string()),
            Reply::NotFound => Err(InvokeError::ToolNotFound {
                binary: binary.to_string(),
            }),
            Reply::ExitCode(code) => Err(InvokeError::ToolExecutionFailed {
                exit_code: Some(code),
                stderr: String::new(),
            }),
            Reply::IoFailure => Err(InvokeError::ToolIoFailed {
                context: "scripted failure".to_string(),
                source: io::ErrorKind::BrokenPipe.into(),
            }),
        }
    }
}

/// Replays [`Reply`] values in order. Once exhausted, every call fails with
/// [`InvokeError::ToolIoFailed`].
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedInvoker {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Shorthand for a plan reply followed by a code reply.
    pub fn plan_then_code(plan: &str, code: &str) -> Self {
        Self::new([Reply::Text(plan.to_string()), Reply::Text(code.to_string())])
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    /// Model identifiers received so far, in call order.
    pub fn models(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelInvoker for ScriptedInvoker {
    async fn invoke(&self, prompt: &str, model: &str) -> Result<String, InvokeError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), model.to_string()));
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply.into_result("scripted-runner"),
            None => Reply::IoFailure.into_result("scripted-runner"),
        }
    }
}

// ---------------------------------------------------------------------------
// Approval source
// ---------------------------------------------------------------------------

/// Answers gates from a fixed list; answers "no" once the list runs out.
#[derive(Debug, Default)]
pub struct ScriptedApproval {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<(Checkpoint, String)>>,
}

impl ScriptedApproval {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Checkpoints asked so far, in order.
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.asked.lock().unwrap().iter().map(|(c, _)| *c).collect()
    }

    /// Questions shown so far, in order.
    pub fn questions(&self) -> Vec<String> {
        self.asked.lock().unwrap().iter().map(|(_, q)| q.clone()).collect()
    }
}

#[async_trait]
impl ApprovalSource for ScriptedApproval {
    async fn approve(&self, checkpoint: Checkpoint, question: &str) -> bool {
        self.asked
            .lock()
            .unwrap()
            .push((checkpoint, question.to_string()));
        self.answers.lock().unwrap().pop_front().unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Script executor
// ---------------------------------------------------------------------------

/// Returns a fixed outcome and records the paths it was asked to run.
#[derive(Debug)]
pub struct RecordingExecutor {
    outcome: ExecutionOutcome,
    runs: Mutex<Vec<PathBuf>>,
}

impl RecordingExecutor {
    pub fn new(outcome: ExecutionOutcome) -> Self {
        Self {
            outcome,
            runs: Mutex::new(Vec::new()),
        }
    }

    pub fn runs(&self) -> Vec<PathBuf> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScriptExecutor for RecordingExecutor {
    async fn execute(&self, path: &Path) -> ExecutionOutcome {
        self.runs.lock().unwrap().push(path.to_path_buf());
        self.outcome.clone()
    }
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

/// Keeps `(title, body)` for every artifact shown.
#[derive(Debug, Default)]
pub struct CapturingReporter {
    shown: Mutex<Vec<(String, String)>>,
}

impl CapturingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap().clone()
    }
}

impl Reporter for CapturingReporter {
    fn show(&self, title: &str, body: &str) {
        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Stub executables
// ---------------------------------------------------------------------------

/// Write an executable `#!/bin/sh` script named `name` into `dir`.
///
/// `body` is the script after the shebang line. Returns the absolute path.
pub fn write_stub_runner(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .unwrap_or_else(|e| panic!("failed to write stub {}: {e}", path.display()));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .unwrap_or_else(|e| panic!("failed to chmod stub {}: {e}", path.display()));
    }

    path
}
