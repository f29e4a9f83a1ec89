use async_trait::async_trait;
pub use waypoint_common::error::SurfaceError;
use waypoint_common::protocol::{
    Capture, ClassifiedAction, ElementRecord, Gesture, NavigationResult, Probe, ProbeOutcome,
    SessionState,
};

/// The live UI a run drives. Every browser integration implements this; the
/// engine never reaches the UI any other way.
#[async_trait]
pub trait Surface: Send {
    /// Start the surface (launch a browser, attach to a session, ...).
    async fn launch(&mut self) -> Result<(), SurfaceError>;

    /// Shut the surface down and release its resources.
    async fn close(&mut self) -> Result<(), SurfaceError>;

    /// Check if the surface is ready to accept commands.
    async fn is_ready(&self) -> bool;

    /// Navigate to a specific URL.
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, SurfaceError>;

    /// Apply pre-authenticated state before the first navigation.
    async fn restore_session(&mut self, _session: &SessionState) -> Result<(), SurfaceError> {
        Err(SurfaceError::NotSupported("restore_session".into()))
    }

    /// Location currently shown by the surface.
    async fn current_url(&mut self) -> Result<String, SurfaceError>;

    /// Collect visible interactive elements plus an accessibility description.
    async fn capture(&mut self) -> Result<Capture, SurfaceError>;

    /// Physically act on an element from the latest capture.
    async fn perform(
        &mut self,
        element: &ElementRecord,
        action: &ClassifiedAction,
    ) -> Result<(), SurfaceError>;

    /// Answer an instantaneous question about the current state.
    async fn probe(&mut self, probe: &Probe) -> Result<ProbeOutcome, SurfaceError>;

    /// Apply a best-effort nudge. Returns whether it had anything to act on.
    async fn gesture(&mut self, gesture: &Gesture) -> Result<bool, SurfaceError>;

    /// Capture a screenshot of the current state.
    async fn screenshot(&mut self) -> Result<Vec<u8>, SurfaceError> {
        Err(SurfaceError::NotSupported("screenshot".into()))
    }
}
