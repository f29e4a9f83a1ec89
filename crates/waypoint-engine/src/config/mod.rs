pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigLoader};
pub use schema::{
    ExecutorConfig, PathsConfig, RunConfig, SurfaceConfig, TimingConfig, WaypointConfig,
};
