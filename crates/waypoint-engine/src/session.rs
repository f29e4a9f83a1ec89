use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use waypoint_common::protocol::SessionState;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No saved session found for {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid session file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Saved authenticated browser state, one file per app.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions_dir: PathBuf,
}

impl SessionStore {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }

    pub fn path_for(&self, app: &str) -> PathBuf {
        self.sessions_dir.join(format!("{}.json", app))
    }

    pub async fn load(&self, app: &str) -> Result<SessionState, SessionError> {
        let path = self.path_for(app);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionError::NotFound(app.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let state: SessionState = serde_json::from_str(&content)?;
        info!(
            "Loaded session for {} ({} cookie(s), {} origin(s))",
            app,
            state.cookies.len(),
            state.origins.len()
        );
        Ok(state)
    }

    pub async fn save(&self, app: &str, state: &SessionState) -> Result<PathBuf, SessionError> {
        tokio::fs::create_dir_all(&self.sessions_dir).await?;
        let path = self.path_for(app);
        tokio::fs::write(&path, serde_json::to_string_pretty(state)?).await?;
        Ok(path)
    }
}
