//! Artifact store: the audit bundle and the executable script.
//!
//! Both files live at fixed paths and are truncated and rewritten on every
//! run. There is no history and no rollback.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// On-disk record of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedBundle {
    pub request: String,
    pub plan: String,
    pub generated_code: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store's paths could not be made absolute.
    #[error("cannot resolve artifact path {path:?}: {source}")]
    PathResolution {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The audit bundle was not written. The run continues without it.
    #[error("failed to save bundle to {path:?}: {source}")]
    BundlePersistFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The script was not written. Execution must not be attempted.
    #[error("failed to save script to {path:?}: {source}")]
    ScriptPersistFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes run artifacts to two fixed, absolute paths.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    bundle_path: PathBuf,
    script_path: PathBuf,
}

impl ArtifactStore {
    /// Create a store, resolving both paths against the current directory
    /// once so later working-directory changes cannot move the artifacts.
    pub fn new(bundle_path: impl AsRef<Path>, script_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            bundle_path: absolute(bundle_path.as_ref())?,
            script_path: absolute(script_path.as_ref())?,
        })
    }

    pub fn bundle_path(&self) -> &Path {
        &self.bundle_path
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Serialize `{request, plan, generated_code}` as pretty JSON,
    /// replacing any previous bundle.
    pub async fn save_bundle(&self, request: &str, plan: &str, code: &str) -> Result<(), StoreError> {
        let bundle = PersistedBundle {
            request: request.to_owned(),
            plan: plan.to_owned(),
            generated_code: code.to_owned(),
        };
        let fail = |source| StoreError::BundlePersistFailure {
            path: self.bundle_path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(&bundle).map_err(|e| fail(io::Error::other(e)))?;
        overwrite(&self.bundle_path, json.as_bytes()).await.map_err(fail)?;

        info!(path = %self.bundle_path.display(), "bundle saved");
        Ok(())
    }

    /// Write `code` plus a trailing newline to the script path, replacing
    /// any previous script. The file is flushed, synced and closed before
    /// this returns. Returns the absolute script path.
    pub async fn save_script(&self, code: &str) -> Result<PathBuf, StoreError> {
        let mut contents = String::with_capacity(code.len() + 1);
        contents.push_str(code);
        contents.push('\n');

        overwrite(&self.script_path, contents.as_bytes())
            .await
            .map_err(|source| StoreError::ScriptPersistFailure {
                path: self.script_path.clone(),
                source,
            })?;

        info!(path = %self.script_path.display(), "script saved");
        Ok(self.script_path.clone())
    }
}

fn absolute(path: &Path) -> Result<PathBuf, StoreError> {
    std::path::absolute(path).map_err(|source| StoreError::PathResolution {
        path: path.to_path_buf(),
        source,
    })
}

/// Truncate-and-write, creating parent directories as needed.
async fn overwrite(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}
