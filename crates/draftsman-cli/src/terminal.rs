//! Interactive approval on the controlling terminal.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use tracing::warn;

use draftsman_core::approval::{ApprovalSource, Checkpoint, is_affirmative};

/// Asks on stdout and reads one line from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalApproval;

fn ask(question: &str) -> io::Result<String> {
    let mut out = io::stdout().lock();
    out.write_all(question.as_bytes())?;
    out.flush()?;
    drop(out);

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer)
}

#[async_trait]
impl ApprovalSource for TerminalApproval {
    async fn approve(&self, checkpoint: Checkpoint, question: &str) -> bool {
        let question = question.to_string();
        match tokio::task::spawn_blocking(move || ask(&question)).await {
            Ok(Ok(answer)) => is_affirmative(&answer),
            Ok(Err(e)) => {
                warn!(%checkpoint, error = %e, "failed to read answer; treating as no");
                false
            }
            Err(e) => {
                warn!(%checkpoint, error = %e, "approval prompt task failed; treating as no");
                false
            }
        }
    }
}
