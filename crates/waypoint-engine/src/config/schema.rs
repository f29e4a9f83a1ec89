use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaypointConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
}

/// Everything one run needs to know about where it starts and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_start_url")]
    pub start_url: String,
    #[serde(default)]
    pub plan_path: Option<PathBuf>,
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_step_settle_ms")]
    pub step_settle_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            start_url: default_start_url(),
            plan_path: None,
            artifact_root: default_artifact_root(),
            max_attempts: default_max_attempts(),
            top_k: default_top_k(),
            step_settle_ms: default_step_settle_ms(),
        }
    }
}

fn default_app_name() -> String {
    "app".to_string()
}

fn default_start_url() -> String {
    "about:blank".to_string()
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from("dataset")
}

fn default_max_attempts() -> u32 {
    2
}

fn default_top_k() -> usize {
    5
}

fn default_step_settle_ms() -> u64 {
    1000
}

/// Upper bounds for every wait in a run. Nothing waits longer than these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_dialog_wait_ms")]
    pub dialog_wait_ms: u64,
    #[serde(default = "default_visible_wait_ms")]
    pub visible_wait_ms: u64,
    #[serde(default = "default_textbox_wait_ms")]
    pub textbox_wait_ms: u64,
    #[serde(default = "default_recovery_dialog_wait_ms")]
    pub recovery_dialog_wait_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_action_settle_ms")]
    pub action_settle_ms: u64,
    #[serde(default = "default_stabilize_idle_ms")]
    pub stabilize_idle_ms: u64,
    #[serde(default = "default_overlay_click_pause_ms")]
    pub overlay_click_pause_ms: u64,
    #[serde(default = "default_escape_pause_ms")]
    pub escape_pause_ms: u64,
    #[serde(default = "default_workspace_wait_ms")]
    pub workspace_wait_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            dialog_wait_ms: default_dialog_wait_ms(),
            visible_wait_ms: default_visible_wait_ms(),
            textbox_wait_ms: default_textbox_wait_ms(),
            recovery_dialog_wait_ms: default_recovery_dialog_wait_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            action_settle_ms: default_action_settle_ms(),
            stabilize_idle_ms: default_stabilize_idle_ms(),
            overlay_click_pause_ms: default_overlay_click_pause_ms(),
            escape_pause_ms: default_escape_pause_ms(),
            workspace_wait_ms: default_workspace_wait_ms(),
        }
    }
}

impl TimingConfig {
    /// No pauses and single-poll waits; for scripted surfaces.
    pub fn immediate() -> Self {
        Self {
            dialog_wait_ms: 0,
            visible_wait_ms: 0,
            textbox_wait_ms: 0,
            recovery_dialog_wait_ms: 0,
            poll_interval_ms: 0,
            action_settle_ms: 0,
            stabilize_idle_ms: 0,
            overlay_click_pause_ms: 0,
            escape_pause_ms: 0,
            workspace_wait_ms: 0,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_dialog_wait_ms() -> u64 {
    3000
}

fn default_visible_wait_ms() -> u64 {
    2000
}

fn default_textbox_wait_ms() -> u64 {
    1000
}

fn default_recovery_dialog_wait_ms() -> u64 {
    2500
}

fn default_poll_interval_ms() -> u64 {
    150
}

fn default_action_settle_ms() -> u64 {
    2000
}

fn default_stabilize_idle_ms() -> u64 {
    250
}

fn default_overlay_click_pause_ms() -> u64 {
    150
}

fn default_escape_pause_ms() -> u64 {
    200
}

fn default_workspace_wait_ms() -> u64 {
    20000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_fill_value")]
    pub default_fill_value: String,
    #[serde(default = "default_name_value")]
    pub default_name_value: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_fill_value: default_fill_value(),
            default_name_value: default_name_value(),
        }
    }
}

fn default_fill_value() -> String {
    "Test Value".to_string()
}

fn default_name_value() -> String {
    "Demo Project".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: PathBuf,
    #[serde(default = "default_plans_dir")]
    pub plans_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sessions_dir: default_sessions_dir(),
            plans_dir: default_plans_dir(),
        }
    }
}

fn default_sessions_dir() -> PathBuf {
    PathBuf::from("sessions")
}

fn default_plans_dir() -> PathBuf {
    PathBuf::from("plans")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    #[serde(default)]
    pub visible: bool,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    /// Browser executable; `CHROME_BIN` when unset, else autodetected.
    #[serde(default)]
    pub chrome_bin: Option<PathBuf>,
    /// Persistent browser profile; `WAYPOINT_USER_DATA_DIR` when unset, else a
    /// throwaway profile removed on close.
    #[serde(default)]
    pub user_data_dir: Option<PathBuf>,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            visible: false,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            chrome_bin: None,
            user_data_dir: None,
        }
    }
}

fn default_viewport_width() -> u32 {
    1600
}

fn default_viewport_height() -> u32 {
    900
}
