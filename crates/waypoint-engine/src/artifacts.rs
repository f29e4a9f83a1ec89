use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PERCEPTION_FILE: &str = "perception.json";
pub const AX_TREE_FILE: &str = "ax_tree.json";
pub const BEFORE_FILE: &str = "before.png";
pub const AFTER_FILE: &str = "after.png";
pub const STEP_FILE: &str = "step.json";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-run artifact tree: `root/step_<n>/...` plus `root/summary.json`.
///
/// Each step owns its directory. Writes for the same step overwrite in place.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn step_dir(&self, step: usize) -> PathBuf {
        self.root.join(format!("step_{}", step))
    }

    pub fn step_file(&self, step: usize, name: &str) -> PathBuf {
        self.step_dir(step).join(name)
    }

    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        step: usize,
        name: &str,
        value: &T,
    ) -> Result<PathBuf, ArtifactError> {
        let content = serde_json::to_string_pretty(value)?;
        self.write_bytes(step, name, content.as_bytes()).await
    }

    pub async fn write_bytes(
        &self,
        step: usize,
        name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, ArtifactError> {
        let dir = self.step_dir(step);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Run-level file directly under the root.
    pub async fn write_run_json<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<PathBuf, ArtifactError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        tokio::fs::write(&path, serde_json::to_string_pretty(value)?).await?;
        Ok(path)
    }
}
