//! Configuration file management for draftsman.
//!
//! Provides an optional TOML config file at `~/.config/draftsman/config.toml`
//! and a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use draftsman_core::PipelineConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

/// Every field is optional; missing ones fall through to the defaults.
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub model: Option<String>,
    pub runner: Option<String>,
    pub interpreter: Option<String>,
    pub script_extension: Option<String>,
    pub bundle_path: Option<PathBuf>,
    pub script_path: Option<PathBuf>,
    pub model_timeout_secs: Option<u64>,
    pub script_timeout_secs: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the draftsman config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/draftsman` or
/// `~/.config/draftsman`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("draftsman");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("draftsman")
}

/// Return the path to the draftsman config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read
// -----------------------------------------------------------------------

/// Load the config file. A missing file is `Ok(None)`; an unreadable or
/// malformed one is an error.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

// -----------------------------------------------------------------------
// Resolution
// -----------------------------------------------------------------------

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub runner: Option<String>,
    pub interpreter: Option<String>,
    pub script_extension: Option<String>,
    pub bundle_path: Option<PathBuf>,
    pub script_path: Option<PathBuf>,
    pub model_timeout_secs: Option<u64>,
    pub script_timeout_secs: Option<u64>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_secs(name: &str) -> Result<Option<u64>> {
    env_var(name)
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .with_context(|| format!("{name} must be a whole number of seconds, got {v:?}"))
        })
        .transpose()
}

/// Resolve a [`PipelineConfig`] using the chain:
/// CLI flag > `DRAFTSMAN_*` env var > config file > built-in default.
///
/// A timeout of `0` seconds means "no timeout".
pub fn resolve(cli: &CliOverrides, file: Option<&ConfigFile>) -> Result<PipelineConfig> {
    let empty = ConfigFile::default();
    let file = file.unwrap_or(&empty);
    let defaults = PipelineConfig::default();

    let model = cli
        .model
        .clone()
        .or_else(|| env_var("DRAFTSMAN_MODEL"))
        .or_else(|| file.model.clone())
        .unwrap_or(defaults.model);

    let runner = cli
        .runner
        .clone()
        .or_else(|| env_var("DRAFTSMAN_RUNNER"))
        .or_else(|| file.runner.clone())
        .unwrap_or(defaults.runner_binary);

    let interpreter = cli
        .interpreter
        .clone()
        .or_else(|| env_var("DRAFTSMAN_INTERPRETER"))
        .or_else(|| file.interpreter.clone())
        .unwrap_or(defaults.interpreter);

    let bundle_path = cli
        .bundle_path
        .clone()
        .or_else(|| env_var("DRAFTSMAN_BUNDLE_PATH").map(PathBuf::from))
        .or_else(|| file.bundle_path.clone())
        .unwrap_or(defaults.bundle_path);

    let script_path = cli
        .script_path
        .clone()
        .or_else(|| env_var("DRAFTSMAN_SCRIPT_PATH").map(PathBuf::from))
        .or_else(|| file.script_path.clone())
        .unwrap_or(defaults.script_path);

    // An explicit extension wins; otherwise the script path's own
    // extension is the one the execution gate will require.
    let script_extension = cli
        .script_extension
        .clone()
        .or_else(|| env_var("DRAFTSMAN_SCRIPT_EXTENSION"))
        .or_else(|| file.script_extension.clone())
        .or_else(|| {
            script_path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_owned)
        });
    let script_extension = match script_extension {
        Some(ext) if !ext.trim().trim_start_matches('.').is_empty() => {
            ext.trim().to_string()
        }
        _ => bail!(
            "script path {} has no extension; set --script-extension or DRAFTSMAN_SCRIPT_EXTENSION",
            script_path.display()
        ),
    };

    let model_timeout = match cli.model_timeout_secs {
        Some(s) => Some(s),
        None => env_secs("DRAFTSMAN_MODEL_TIMEOUT")?.or(file.model_timeout_secs),
    };
    let script_timeout = match cli.script_timeout_secs {
        Some(s) => Some(s),
        None => env_secs("DRAFTSMAN_SCRIPT_TIMEOUT")?.or(file.script_timeout_secs),
    };

    Ok(PipelineConfig::default()
        .model(model)
        .runner_binary(runner)
        .interpreter(interpreter)
        .script_extension(script_extension)
        .bundle_path(bundle_path)
        .script_path(script_path)
        .model_timeout(seconds(model_timeout))
        .script_timeout(seconds(script_timeout)))
}

fn seconds(secs: Option<u64>) -> Option<Duration> {
    secs.filter(|s| *s > 0).map(Duration::from_secs)
}

/// Render a resolved config in config-file form.
pub fn to_toml(config: &PipelineConfig) -> Result<String> {
    let file = ConfigFile {
        model: Some(config.model.clone()),
        runner: Some(config.runner_binary.clone()),
        interpreter: Some(config.interpreter.clone()),
        script_extension: Some(config.script_extension.clone()),
        bundle_path: Some(config.bundle_path.clone()),
        script_path: Some(config.script_path.clone()),
        model_timeout_secs: config.model_timeout.map(|d| d.as_secs()),
        script_timeout_secs: config.script_timeout.map(|d| d.as_secs()),
    };
    toml::to_string_pretty(&file).context("failed to serialize config")
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
