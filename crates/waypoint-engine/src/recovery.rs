//! Bounded self-healing for a failed step.
//!
//! Each attempt stabilizes the surface, re-perceives the step, re-ranks the
//! candidates and tries them in order, skipping the element that already
//! failed. Attempts are driven by an explicit state loop.

use crate::config::TimingConfig;
use crate::executor::ActionExecutor;
use crate::perception::Perceiver;
use crate::resolution::CandidateScorer;
use crate::surface::{Surface, SurfaceError};
use crate::wait::{pause, wait_for};
use std::time::Duration;
use tracing::{debug, info, warn};
use waypoint_common::protocol::{ElementRecord, ExecutorResult, Gesture, Probe, RecoveryMeta};

/// Buttons that usually close tours, toasts and cookie banners.
pub const OVERLAY_LABELS: &[&str] = &["Close", "Dismiss", "Got it", "Skip"];

const DIALOG_HINTS: &[&str] = &["dialog", "modal", "prompt"];

const WHEEL_DOWN: f64 = 600.0;
const WHEEL_BACK: f64 = -300.0;
const WHEEL_PAUSE_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Attempting(u32),
    /// Terminal: the given attempt produced a successful action.
    Recovered(u32),
    /// Terminal: every attempt failed.
    Exhausted,
}

impl RecoveryState {
    /// Entry state for a run starting at attempt `first` (clamped to 1).
    pub fn start(first: u32, max_attempts: u32) -> Self {
        let first = first.max(1);
        if first > max_attempts {
            RecoveryState::Exhausted
        } else {
            RecoveryState::Attempting(first)
        }
    }

    pub fn advance(self, succeeded: bool, max_attempts: u32) -> Self {
        match self {
            RecoveryState::Attempting(n) if succeeded => RecoveryState::Recovered(n),
            RecoveryState::Attempting(n) if n < max_attempts => RecoveryState::Attempting(n + 1),
            RecoveryState::Attempting(_) => RecoveryState::Exhausted,
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RecoveryState::Attempting(_))
    }
}

/// Terminal report of a recovery run.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryOutcome {
    pub recovered: bool,
    pub attempts_used: u32,
    /// The element the successful action landed on, when recovered.
    pub element: Option<ElementRecord>,
    /// The successful action, when recovered.
    pub result: Option<ExecutorResult>,
}

impl RecoveryOutcome {
    pub fn meta(&self) -> RecoveryMeta {
        RecoveryMeta {
            recovered: self.recovered,
            attempts_used: self.attempts_used,
        }
    }
}

/// Drop every candidate sharing the failed element's box, unless that would
/// leave nothing to try.
pub fn exclude_failed<T>(
    candidates: Vec<T>,
    avoid: Option<&ElementRecord>,
    element_of: impl Fn(&T) -> &ElementRecord,
) -> Vec<T> {
    let Some(avoid) = avoid else {
        return candidates;
    };
    if candidates.iter().all(|c| element_of(c).same_box(avoid)) {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|c| !element_of(c).same_box(avoid))
        .collect()
}

/// What failed and needs another try.
#[derive(Debug, Clone, Copy)]
pub struct FailedStep<'a> {
    pub step: usize,
    pub intent: &'a str,
    pub expected: &'a str,
    /// The element whose action or verification failed.
    pub avoid: Option<&'a ElementRecord>,
}

#[derive(Debug, Clone)]
pub struct Recovery {
    perceiver: Perceiver,
    executor: ActionExecutor,
    timing: TimingConfig,
    max_attempts: u32,
    top_k: usize,
}

impl Recovery {
    pub fn new(
        perceiver: Perceiver,
        executor: ActionExecutor,
        timing: TimingConfig,
        max_attempts: u32,
        top_k: usize,
    ) -> Self {
        Self {
            perceiver,
            executor,
            timing,
            max_attempts,
            top_k,
        }
    }

    pub async fn recover<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        failed: FailedStep<'_>,
    ) -> Result<RecoveryOutcome, SurfaceError> {
        self.recover_from(surface, failed, 1).await
    }

    /// Run attempts `first..=max_attempts`. Starting past the ceiling
    /// returns `Exhausted` without touching the surface.
    pub async fn recover_from<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        failed: FailedStep<'_>,
        first: u32,
    ) -> Result<RecoveryOutcome, SurfaceError> {
        let mut state = RecoveryState::start(first, self.max_attempts);
        let mut success = None;

        while let RecoveryState::Attempting(n) = state {
            info!(
                "Recovery attempt {}/{} for step {}",
                n, self.max_attempts, failed.step
            );
            success = self.attempt(surface, &failed).await?;
            state = state.advance(success.is_some(), self.max_attempts);
        }

        let outcome = match (state, success) {
            (RecoveryState::Recovered(n), Some((element, result))) => RecoveryOutcome {
                recovered: true,
                attempts_used: n,
                element: Some(element),
                result: Some(result),
            },
            _ => RecoveryOutcome {
                recovered: false,
                attempts_used: self.max_attempts,
                element: None,
                result: None,
            },
        };
        info!(
            "Recovery for step {} {} after {} attempt(s)",
            failed.step,
            if outcome.recovered {
                "succeeded"
            } else {
                "exhausted"
            },
            outcome.attempts_used
        );
        Ok(outcome)
    }

    /// One pass. `Some` carries the first candidate that acted successfully.
    async fn attempt<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        failed: &FailedStep<'_>,
    ) -> Result<Option<(ElementRecord, ExecutorResult)>, SurfaceError> {
        self.stabilize(surface).await?;
        self.wait_for_expected_dialog(surface, failed).await?;
        self.dismiss_overlays(surface).await?;

        let snapshot = self.perceiver.capture(surface, failed.step).await?;
        let scorer = CandidateScorer::new(failed.intent);
        let ranked = scorer.top_k(&snapshot.elements, self.top_k);
        let ordered = exclude_failed(ranked, failed.avoid, |c| &c.element);
        debug!(
            "Recovery has {} candidate(s) for step {}",
            ordered.len(),
            failed.step
        );

        for candidate in ordered {
            let result = self
                .executor
                .execute(surface, &candidate.element, failed.intent, failed.step)
                .await?;
            if result.is_success() {
                return Ok(Some((candidate.element, result)));
            }
        }

        self.gesture(surface, Gesture::PressKey {
            key: "Escape".into(),
        })
        .await?;
        pause(self.timing.escape_pause_ms).await;
        Ok(None)
    }

    async fn stabilize<S: Surface + ?Sized>(&self, surface: &mut S) -> Result<(), SurfaceError> {
        pause(self.timing.stabilize_idle_ms).await;
        self.gesture(surface, Gesture::ScrollToTop).await?;
        self.gesture(surface, Gesture::Wheel {
            delta_y: WHEEL_DOWN,
        })
        .await?;
        pause(WHEEL_PAUSE_MS.min(self.timing.stabilize_idle_ms)).await;
        self.gesture(surface, Gesture::Wheel {
            delta_y: WHEEL_BACK,
        })
        .await?;
        Ok(())
    }

    async fn wait_for_expected_dialog<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        failed: &FailedStep<'_>,
    ) -> Result<(), SurfaceError> {
        let text = format!("{} {}", failed.intent, failed.expected).to_lowercase();
        if !DIALOG_HINTS.iter().any(|k| text.contains(k)) {
            return Ok(());
        }
        let found = wait_for(
            surface,
            &Probe::DialogPresent,
            Duration::from_millis(self.timing.recovery_dialog_wait_ms),
            self.timing.poll_interval(),
        )
        .await?;
        if found.is_none() {
            debug!("Expected dialog did not appear for step {}", failed.step);
        }
        Ok(())
    }

    async fn dismiss_overlays<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
    ) -> Result<(), SurfaceError> {
        for label in OVERLAY_LABELS {
            let hit = self
                .gesture(surface, Gesture::ClickByRole {
                    role: "button".into(),
                    name: label.to_string(),
                })
                .await?;
            if hit {
                debug!("Dismissed overlay via '{}'", label);
                pause(self.timing.overlay_click_pause_ms).await;
            }
        }
        Ok(())
    }

    /// Best-effort gesture: non-fatal errors read as "nothing happened".
    async fn gesture<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        gesture: Gesture,
    ) -> Result<bool, SurfaceError> {
        match surface.gesture(&gesture).await {
            Ok(hit) => Ok(hit),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Gesture {:?} failed: {}", gesture, e);
                Ok(false)
            }
        }
    }
}
