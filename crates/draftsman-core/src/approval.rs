//! Human approval gates.
//!
//! The pipeline asks an [`ApprovalSource`] twice: once after the plan is
//! shown and once after the script is written. Interactive terminals,
//! pre-supplied answers and test doubles all implement the same trait.

use std::fmt;

use async_trait::async_trait;

/// Which gate is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    /// After the plan is displayed, before code generation.
    Plan,
    /// After the script is written, before it runs.
    Execution,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan => write!(f, "plan"),
            Self::Execution => write!(f, "execution"),
        }
    }
}

/// Source of yes/no decisions at each [`Checkpoint`].
#[async_trait]
pub trait ApprovalSource: Send + Sync {
    /// Return `true` to advance past `checkpoint`. `question` is the text
    /// to show a human. Any failure to obtain an answer is a "no".
    async fn approve(&self, checkpoint: Checkpoint, question: &str) -> bool;
}

/// Only a single `y` (any case, surrounding whitespace ignored) approves.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Gives the same answer at every gate (e.g. `--yes`).
#[derive(Debug, Clone, Copy)]
pub struct PresetApproval(pub bool);

#[async_trait]
impl ApprovalSource for PresetApproval {
    async fn approve(&self, checkpoint: Checkpoint, _question: &str) -> bool {
        tracing::info!(%checkpoint, approved = self.0, "approval pre-supplied");
        self.0
    }
}
