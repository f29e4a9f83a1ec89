use crate::surface::{Surface, SurfaceError};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;
use waypoint_common::protocol::{Probe, ProbeOutcome};

const MIN_POLL: Duration = Duration::from_millis(10);

/// Poll `probe` until it reports found or `timeout` elapses. The probe always
/// runs at least once. Non-fatal probe errors count as "not found yet".
pub async fn wait_for<S: Surface + ?Sized>(
    surface: &mut S,
    probe: &Probe,
    timeout: Duration,
    interval: Duration,
) -> Result<Option<ProbeOutcome>, SurfaceError> {
    let deadline = Instant::now() + timeout;
    let interval = interval.max(MIN_POLL);
    let mut polls = 0u32;

    loop {
        polls += 1;
        match surface.probe(probe).await {
            Ok(outcome) if outcome.found => return Ok(Some(outcome)),
            Ok(_) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => debug!("Probe '{}' failed: {}", probe, e),
        }

        let now = Instant::now();
        if now >= deadline {
            debug!("Probe '{}' gave up after {} poll(s)", probe, polls);
            return Ok(None);
        }
        sleep(interval.min(deadline - now)).await;
    }
}

/// Sleep for `ms` milliseconds; zero returns immediately.
pub async fn pause(ms: u64) {
    if ms > 0 {
        sleep(Duration::from_millis(ms)).await;
    }
}
