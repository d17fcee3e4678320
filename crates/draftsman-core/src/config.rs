use std::path::PathBuf;
use std::time::Duration;

/// Everything the pipeline needs to know about its collaborators.
///
/// Use [`PipelineConfig::default`] for the stock setup, then chain the
/// builder-style setters to override individual fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Model identifier handed to the runner (`<runner> run <model>`).
    pub model: String,
    /// Executable that hosts the model. Looked up on `$PATH` when bare.
    pub runner_binary: String,
    /// Interpreter used to run the generated script.
    pub interpreter: String,
    /// Extension (without the dot) the script file must carry to be run.
    pub script_extension: String,
    /// Where the `{request, plan, generated_code}` bundle is written.
    pub bundle_path: PathBuf,
    /// Where the generated script is written.
    pub script_path: PathBuf,
    /// Upper bound on a single model round trip. `None` waits forever.
    pub model_timeout: Option<Duration>,
    /// Upper bound on the generated script's run. `None` waits forever.
    pub script_timeout: Option<Duration>,
}

impl PipelineConfig {
    pub const DEFAULT_MODEL: &str = "codellama:7b";
    pub const DEFAULT_RUNNER: &str = "ollama";
    pub const DEFAULT_INTERPRETER: &str = "python3";
    pub const DEFAULT_SCRIPT_EXTENSION: &str = "py";
    pub const DEFAULT_BUNDLE_PATH: &str = "generated_prompt.json";
    pub const DEFAULT_SCRIPT_PATH: &str = "generated_script.py";

    /// Set the model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the model runner executable.
    pub fn runner_binary(mut self, runner: impl Into<String>) -> Self {
        self.runner_binary = runner.into();
        self
    }

    /// Set the script interpreter.
    pub fn interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Set the required script extension. A leading dot is ignored.
    pub fn script_extension(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        self.script_extension = ext.trim_start_matches('.').to_string();
        self
    }

    /// Set the bundle path.
    pub fn bundle_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.bundle_path = path.into();
        self
    }

    /// Set the script path.
    pub fn script_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_path = path.into();
        self
    }

    /// Bound each model round trip.
    pub fn model_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.model_timeout = timeout;
        self
    }

    /// Bound the generated script's run.
    pub fn script_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.script_timeout = timeout;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_owned(),
            runner_binary: Self::DEFAULT_RUNNER.to_owned(),
            interpreter: Self::DEFAULT_INTERPRETER.to_owned(),
            script_extension: Self::DEFAULT_SCRIPT_EXTENSION.to_owned(),
            bundle_path: PathBuf::from(Self::DEFAULT_BUNDLE_PATH),
            script_path: PathBuf::from(Self::DEFAULT_SCRIPT_PATH),
            model_timeout: None,
            script_timeout: None,
        }
    }
}
