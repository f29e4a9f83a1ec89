use thiserror::Error;

/// Errors raised by a live UI surface.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Surface not ready")]
    NotReady,

    #[error("Surface disconnected: {0}")]
    Disconnected(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SurfaceError {
    /// Whether the surface is gone for good. Everything else is local to one
    /// probe, gesture or action and gets converted into a verdict by the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SurfaceError::NotReady | SurfaceError::Disconnected(_))
    }
}
