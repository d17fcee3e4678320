//! Pipeline orchestrator: sequences the stages between two approval gates.
//!
//! ```text
//! start       -> planning
//! planning    -> await_plan_approval
//! await_plan_approval -> code_gen | aborted
//! code_gen    -> persisting
//! persisting  -> await_exec_approval
//! await_exec_approval -> executing | aborted
//! executing   -> done
//! ```
//!
//! Model and script-persistence failures end the run with a
//! [`PipelineError`]. Everything else (a lost bundle, a failing script) is
//! logged and the run carries on to a terminal state.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::approval::{ApprovalSource, Checkpoint};
use crate::config::PipelineConfig;
use crate::exec::{ExecutionGate, ExecutionOutcome, ScriptExecutor};
use crate::invoker::{InvokeError, ModelInvoker, SubprocessInvoker};
use crate::report::{ConsoleReporter, Reporter};
use crate::stage;
use crate::store::{ArtifactStore, StoreError};
use crate::types::Request;

/// Position of a run in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Start,
    Planning,
    AwaitPlanApproval,
    CodeGen,
    Persisting,
    AwaitExecApproval,
    Executing,
    Aborted,
    Done,
}

impl RunState {
    /// Whether `self -> to` is an edge in the state graph.
    pub fn can_transition_to(self, to: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, to),
            (Start, Planning)
                | (Planning, AwaitPlanApproval)
                | (AwaitPlanApproval, CodeGen)
                | (AwaitPlanApproval, Aborted)
                | (CodeGen, Persisting)
                | (Persisting, AwaitExecApproval)
                | (AwaitExecApproval, Executing)
                | (AwaitExecApproval, Aborted)
                | (Executing, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Aborted | RunState::Done)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Planning => "planning",
            Self::AwaitPlanApproval => "await_plan_approval",
            Self::CodeGen => "code_gen",
            Self::Persisting => "persisting",
            Self::AwaitExecApproval => "await_exec_approval",
            Self::Executing => "executing",
            Self::Aborted => "aborted",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The user declined at `at`.
    Aborted { at: Checkpoint },
    /// The script was run. Its own success or failure is in `execution`.
    Done {
        script_path: PathBuf,
        execution: ExecutionOutcome,
    },
}

impl RunOutcome {
    /// Process exit code for a finished run. A declined gate or a failing
    /// script is still a completed run.
    pub fn exit_code(&self) -> i32 {
        0
    }
}

/// Errors that end a run early.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("request is empty")]
    EmptyRequest,

    #[error("plan generation failed")]
    Plan(#[source] InvokeError),

    #[error("code generation failed")]
    Code(#[source] InvokeError),

    #[error("artifact store setup failed")]
    Setup(#[source] StoreError),

    #[error("script could not be saved; not executing")]
    ScriptPersist(#[source] StoreError),
}

impl PipelineError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Drives a single request through the pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    invoker: Arc<dyn ModelInvoker>,
    approvals: Arc<dyn ApprovalSource>,
    executor: Arc<dyn ScriptExecutor>,
    reporter: Arc<dyn Reporter>,
    store: ArtifactStore,
    state: RunState,
}

impl Pipeline {
    /// Build a pipeline with the subprocess invoker, the interpreter-based
    /// execution gate and console output, all derived from `config`.
    pub fn from_config(
        config: PipelineConfig,
        approvals: Arc<dyn ApprovalSource>,
    ) -> Result<Self, PipelineError> {
        let invoker = SubprocessInvoker::new(config.runner_binary.clone())
            .with_timeout(config.model_timeout);
        debug!(runner = invoker.runner_binary(), model = %config.model, "model invoker ready");
        Self::new(config, Arc::new(invoker), approvals)
    }

    /// Build a pipeline around an explicit model invoker.
    pub fn new(
        config: PipelineConfig,
        invoker: Arc<dyn ModelInvoker>,
        approvals: Arc<dyn ApprovalSource>,
    ) -> Result<Self, PipelineError> {
        let store = ArtifactStore::new(&config.bundle_path, &config.script_path)
            .map_err(PipelineError::Setup)?;
        let executor = ExecutionGate::new(config.interpreter.clone(), config.script_extension.clone())
            .with_timeout(config.script_timeout);

        Ok(Self {
            config,
            invoker,
            approvals,
            executor: Arc::new(executor),
            reporter: Arc::new(ConsoleReporter),
            store,
            state: RunState::Start,
        })
    }

    /// Replace the script executor.
    pub fn with_executor(mut self, executor: Arc<dyn ScriptExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Replace the artifact reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    fn advance(&mut self, to: RunState) {
        debug_assert!(
            self.state.can_transition_to(to),
            "invalid run transition: {} -> {}",
            self.state,
            to
        );
        debug!(from = %self.state, %to, "run state transition");
        self.state = to;
    }

    /// Run `request` to a terminal state.
    ///
    /// Returns `Err` only for failures that abort the run: a blank request,
    /// a model runner failure, or a script that could not be written.
    pub async fn run(&mut self, request: &str) -> Result<RunOutcome, PipelineError> {
        self.state = RunState::Start;
        let request = Request::new(request).ok_or(PipelineError::EmptyRequest)?;
        if let Ok(cwd) = std::env::current_dir() {
            info!(cwd = %cwd.display(), "working directory");
        }

        self.advance(RunState::Planning);
        let plan = stage::build_plan(self.invoker.as_ref(), &self.config.model, &request)
            .await
            .map_err(PipelineError::Plan)?;
        self.reporter.show("plan", plan.as_str());

        self.advance(RunState::AwaitPlanApproval);
        let proceed = self
            .approvals
            .approve(
                Checkpoint::Plan,
                "Do you want to proceed with code generation based on this plan? (Y/N) ",
            )
            .await;
        if !proceed {
            self.advance(RunState::Aborted);
            info!("user aborted after plan");
            return Ok(RunOutcome::Aborted {
                at: Checkpoint::Plan,
            });
        }

        self.advance(RunState::CodeGen);
        let code = stage::build_code(self.invoker.as_ref(), &self.config.model, &plan, &request)
            .await
            .map_err(PipelineError::Code)?;
        self.reporter.show("code", code.as_str());

        self.advance(RunState::Persisting);
        if let Err(e) = self
            .store
            .save_bundle(request.as_str(), plan.as_str(), code.as_str())
            .await
        {
            warn!(error = %e, "bundle not saved; continuing");
        }
        let script_path = self.store.save_script(code.as_str()).await.map_err(|e| {
            error!(error = %e, "script not saved");
            PipelineError::ScriptPersist(e)
        })?;

        self.advance(RunState::AwaitExecApproval);
        let question = format!(
            "Review the file '{}'. Proceed with execution? (Y/N) ",
            script_path.display()
        );
        if !self.approvals.approve(Checkpoint::Execution, &question).await {
            self.advance(RunState::Aborted);
            info!("user aborted before script execution");
            return Ok(RunOutcome::Aborted {
                at: Checkpoint::Execution,
            });
        }

        self.advance(RunState::Executing);
        let execution = self.executor.execute(&script_path).await;
        if execution.is_success() {
            info!("{execution}");
        } else {
            warn!(outcome = %execution, "generated script did not succeed");
        }

        self.advance(RunState::Done);
        info!("done");
        Ok(RunOutcome::Done {
            script_path,
            execution,
        })
    }
}
