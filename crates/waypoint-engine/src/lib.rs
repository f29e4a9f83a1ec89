pub mod artifacts;
pub mod config;
pub mod executor;
pub mod normalizer;
pub mod orchestrator;
pub mod perception;
pub mod plan;
pub mod recovery;
pub mod resolution;
pub mod session;
pub mod surface;
pub mod verifier;
pub mod wait;

pub use waypoint_common::formatter;
pub use waypoint_common::protocol;
