//! Core pipeline for draftsman.
//!
//! A request flows through plan generation, a human approval gate, code
//! generation, persistence, a second approval gate, and finally execution
//! of the generated script:
//!
//! ```text
//! request --> stage::build_plan --(approve?)--> stage::build_code
//!         --> ArtifactStore (bundle + script) --(approve?)--> ScriptExecutor
//! ```
//!
//! The model runner, the approval source, the script executor and the
//! user-facing reporter are all trait seams so [`pipeline::Pipeline`] can be
//! driven end to end without a terminal or a real model.

pub mod approval;
pub mod config;
pub mod exec;
pub mod invoker;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod stage;
pub mod store;
pub mod types;

pub use approval::{ApprovalSource, Checkpoint, PresetApproval, is_affirmative};
pub use config::PipelineConfig;
pub use exec::{ExecutionGate, ExecutionOutcome, ScriptExecutor};
pub use invoker::{InvokeError, ModelInvoker, SubprocessInvoker};
pub use pipeline::{Pipeline, PipelineError, RunOutcome, RunState};
pub use report::{ConsoleReporter, Reporter};
pub use store::{ArtifactStore, PersistedBundle, StoreError};
pub use types::{CodeArtifact, PlanArtifact, Request};
