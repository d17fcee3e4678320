//! User-facing output for generated artifacts.
//!
//! Logs go to stderr through `tracing`; the plan and the code are shown on
//! stdout through a [`Reporter`] so they stay readable and capturable.

use std::io::Write;

/// Shows artifacts to the human in the loop.
pub trait Reporter: Send + Sync {
    /// Display `body` under a `title` banner.
    fn show(&self, title: &str, body: &str);
}

/// Prints artifacts to stdout between banner lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn show(&self, title: &str, body: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(banner(title, body).as_bytes());
        let _ = out.flush();
    }
}

/// Render `body` framed by `=== TITLE ===` and `=== END TITLE ===`.
pub fn banner(title: &str, body: &str) -> String {
    let title = title.to_uppercase();
    format!("\n=== {title} ===\n{body}\n=== END {title} ===\n\n")
}
