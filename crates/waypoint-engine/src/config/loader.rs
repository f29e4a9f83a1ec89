use super::schema::WaypointConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./waypoint.yaml
    /// 2. ~/.waypoint/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<WaypointConfig, ConfigError> {
        let local_config = PathBuf::from("./waypoint.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".waypoint").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(WaypointConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<WaypointConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: WaypointConfig = serde_yaml::from_str(&content)?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &WaypointConfig) -> Result<(), ConfigError> {
        if config.run.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "run.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
