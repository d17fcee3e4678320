mod config;
mod terminal;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::error;

use draftsman_core::approval::{ApprovalSource, Checkpoint, PresetApproval};
use draftsman_core::pipeline::{Pipeline, RunOutcome};

use config::CliOverrides;
use terminal::TerminalApproval;

#[derive(Parser, Debug)]
#[command(
    name = "draftsman",
    version,
    about = "Turn a request into a reviewed, runnable script using a local LLM"
)]
struct Cli {
    /// What the generated script should do, in plain words
    #[arg(required_unless_present = "print_config")]
    request: Option<String>,

    /// Model identifier passed to the runner (overrides DRAFTSMAN_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Model runner executable (overrides DRAFTSMAN_RUNNER)
    #[arg(long)]
    runner: Option<String>,

    /// Interpreter used to run the generated script (overrides DRAFTSMAN_INTERPRETER)
    #[arg(long)]
    interpreter: Option<String>,

    /// Extension the generated script must carry (overrides DRAFTSMAN_SCRIPT_EXTENSION)
    #[arg(long, value_name = "EXT")]
    script_extension: Option<String>,

    /// Where to write the request/plan/code bundle (overrides DRAFTSMAN_BUNDLE_PATH)
    #[arg(long)]
    bundle_path: Option<PathBuf>,

    /// Where to write the generated script (overrides DRAFTSMAN_SCRIPT_PATH)
    #[arg(long)]
    script_path: Option<PathBuf>,

    /// Seconds to wait for each model response; 0 waits forever
    #[arg(long, value_name = "SECS")]
    model_timeout: Option<u64>,

    /// Seconds to let the generated script run; 0 waits forever
    #[arg(long, value_name = "SECS")]
    script_timeout: Option<u64>,

    /// Approve both gates without prompting
    #[arg(short, long)]
    yes: bool,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    /// Print the resolved configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            model: self.model.clone(),
            runner: self.runner.clone(),
            interpreter: self.interpreter.clone(),
            script_extension: self.script_extension.clone(),
            bundle_path: self.bundle_path.clone(),
            script_path: self.script_path.clone(),
            model_timeout_secs: self.model_timeout,
            script_timeout_secs: self.script_timeout,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Execute one run. Returns the process exit code.
async fn run(cli: Cli) -> anyhow::Result<i32> {
    let file = config::load_config()?;
    let resolved = config::resolve(&cli.overrides(), file.as_ref())?;

    if cli.print_config {
        print!("{}", config::to_toml(&resolved)?);
        return Ok(0);
    }

    let request = cli.request.context("a request is required")?;

    let approvals: Arc<dyn ApprovalSource> = if cli.yes {
        Arc::new(PresetApproval(true))
    } else {
        Arc::new(TerminalApproval)
    };

    let mut pipeline = Pipeline::from_config(resolved, approvals)?;

    match pipeline.run(&request).await {
        Ok(outcome) => {
            match &outcome {
                RunOutcome::Aborted {
                    at: Checkpoint::Plan,
                } => println!("Aborted after the plan; nothing was generated."),
                RunOutcome::Aborted {
                    at: Checkpoint::Execution,
                } => println!(
                    "Aborted before execution; the script is at {}",
                    pipeline.store().script_path().display()
                ),
                RunOutcome::Done { execution, .. } => println!("Done: {execution}."),
            }
            Ok(outcome.exit_code())
        }
        Err(e) => {
            let code = e.exit_code();
            error!(state = %pipeline.state(), "run failed");
            eprintln!("error: {:#}", anyhow::Error::new(e));
            Ok(code)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures.
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_positional() {
        let cli = Cli::try_parse_from(["draftsman", "create a folder named reports"]).unwrap();
        assert_eq!(cli.request.as_deref(), Some("create a folder named reports"));
        assert!(!cli.yes);
        assert!(!cli.print_config);
    }

    #[test]
    fn missing_request_is_a_usage_error() {
        let err = Cli::try_parse_from(["draftsman"]).unwrap_err();
        assert!(err.use_stderr());
    }

    #[test]
    fn print_config_needs_no_request() {
        let cli = Cli::try_parse_from(["draftsman", "--print-config"]).unwrap();
        assert!(cli.print_config);
        assert!(cli.request.is_none());
    }

    #[test]
    fn flags_map_to_overrides() {
        let cli = Cli::try_parse_from([
            "draftsman",
            "--model",
            "llama3",
            "--runner",
            "/usr/local/bin/ollama",
            "--script-path",
            "out/s.py",
            "--script-extension",
            "py",
            "--model-timeout",
            "90",
            "-y",
            "make a dir",
        ])
        .unwrap();

        let o = cli.overrides();
        assert_eq!(o.model.as_deref(), Some("llama3"));
        assert_eq!(o.runner.as_deref(), Some("/usr/local/bin/ollama"));
        assert_eq!(o.script_path, Some(PathBuf::from("out/s.py")));
        assert_eq!(o.script_extension.as_deref(), Some("py"));
        assert_eq!(o.model_timeout_secs, Some(90));
        assert!(o.bundle_path.is_none());
        assert!(cli.yes);
    }
}
