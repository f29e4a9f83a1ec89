use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid plan: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No cached plan for {app}: {task}")]
    NotCached { app: String, task: String },
}

/// One `{intent, expected_state}` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(alias = "step")]
    pub intent: String,
    #[serde(default)]
    pub expected_state: String,
}

/// Ordered steps, consumed once per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { steps }
    }

    pub async fn load(path: &Path) -> Result<Self, PlanError> {
        let content = tokio::fs::read_to_string(path).await?;
        let plan: Plan = serde_json::from_str(&content)?;
        info!("Loaded {} step(s) from {}", plan.len(), path.display());
        Ok(plan)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Plans stored per app and task under a root directory.
#[derive(Debug, Clone)]
pub struct PlanCache {
    plans_dir: PathBuf,
}

impl PlanCache {
    pub fn new(plans_dir: impl Into<PathBuf>) -> Self {
        Self {
            plans_dir: plans_dir.into(),
        }
    }

    /// `<plans_dir>/<app>/<task lowercased, spaces as underscores>.json`
    pub fn path_for(&self, app: &str, task: &str) -> PathBuf {
        let file = format!("{}.json", task.to_lowercase().replace(' ', "_"));
        self.plans_dir.join(app).join(file)
    }

    pub async fn get(&self, app: &str, task: &str) -> Result<Plan, PlanError> {
        let path = self.path_for(app, task);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(PlanError::NotCached {
                app: app.to_string(),
                task: task.to_string(),
            });
        }
        Plan::load(&path).await
    }

    pub async fn store(&self, app: &str, task: &str, plan: &Plan) -> Result<PathBuf, PlanError> {
        let path = self.path_for(app, task);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, serde_json::to_string_pretty(plan)?).await?;
        info!("Plan saved to {}", path.display());
        Ok(path)
    }
}
