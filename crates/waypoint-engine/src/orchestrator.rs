//! The step loop: Perceive, Resolve, Act, Verify, Recover, Persist.

use crate::artifacts::{ArtifactStore, STEP_FILE, SUMMARY_FILE};
use crate::config::WaypointConfig;
use crate::executor::ActionExecutor;
use crate::perception::Perceiver;
use crate::plan::{Plan, PlanStep};
use crate::recovery::{FailedStep, Recovery};
use crate::resolution::CandidateScorer;
use crate::surface::{Surface, SurfaceError};
use crate::verifier::Verifier;
use crate::wait::{pause, wait_for};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use waypoint_common::protocol::{
    ElementRecord, ExecutionStatus, ExecutorMeta, ExecutorResult, Probe, RecoveryMeta,
    SessionState, StepRecord,
};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Surface became unusable: {0}")]
    SurfaceLost(#[from] SurfaceError),
    #[error("Invalid start url '{url}': {reason}")]
    InvalidStartUrl { url: String, reason: String },
    #[error("Failed to launch surface: {0}")]
    Launch(SurfaceError),
}

/// Final outcome of one plan step. Built once, never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub step: usize,
    pub intent: String,
    pub expected_state: String,
    /// The element resolution chose, if any.
    pub element: Option<ElementRecord>,
    /// The adopted action outcome. Absent when the step was skipped.
    pub action: Option<ExecutorResult>,
    pub verified: bool,
    pub recovery: Option<RecoveryMeta>,
}

impl StepResult {
    fn skipped(step: usize, plan_step: &PlanStep) -> Self {
        Self {
            step,
            intent: plan_step.intent.clone(),
            expected_state: plan_step.expected_state.clone(),
            element: None,
            action: None,
            verified: false,
            recovery: None,
        }
    }

    pub fn status(&self) -> ExecutionStatus {
        self.action
            .as_ref()
            .map(|a| a.status)
            .unwrap_or(ExecutionStatus::SkippedNoElement)
    }

    pub fn was_recovered(&self) -> bool {
        self.recovery.is_some_and(|r| r.recovered)
    }

    /// The persisted `step.json` shape.
    pub fn to_record(&self) -> StepRecord {
        StepRecord {
            step_id: self.step,
            intent: self.intent.clone(),
            expected_state: self.expected_state.clone(),
            executor_status: self.status(),
            verified: self.verified,
            executor_meta: self.action.as_ref().map(ExecutorMeta::from),
            recovery: self.recovery,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub steps: Vec<StepResult>,
    pub verified: usize,
    pub skipped: usize,
    pub recovered: usize,
}

impl RunSummary {
    fn push(&mut self, result: StepResult) {
        if result.verified {
            self.verified += 1;
        }
        if result.status() == ExecutionStatus::SkippedNoElement {
            self.skipped += 1;
        }
        if result.was_recovered() {
            self.recovered += 1;
        }
        self.steps.push(result);
    }

    pub fn records(&self) -> Vec<StepRecord> {
        self.steps.iter().map(StepResult::to_record).collect()
    }
}

/// Drives a plan against one exclusively owned surface, strictly in order.
pub struct Orchestrator {
    config: WaypointConfig,
    store: ArtifactStore,
    perceiver: Perceiver,
    executor: ActionExecutor,
    verifier: Verifier,
    recovery: Recovery,
}

impl Orchestrator {
    pub fn new(config: WaypointConfig) -> Self {
        let store = ArtifactStore::new(config.run.artifact_root.clone());
        let perceiver = Perceiver::new(store.clone());
        let executor = ActionExecutor::new(
            store.clone(),
            config.executor.clone(),
            config.timing.action_settle_ms,
        );
        let verifier = Verifier::new(config.timing.clone());
        let recovery = Recovery::new(
            perceiver.clone(),
            executor.clone(),
            config.timing.clone(),
            config.run.max_attempts,
            config.run.top_k,
        );
        Self {
            config,
            store,
            perceiver,
            executor,
            verifier,
            recovery,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run every step of `plan`. A failing step never stops the loop; only a
    /// fatal surface error ends the run early.
    pub async fn run<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        plan: &Plan,
        session: Option<&SessionState>,
    ) -> Result<RunSummary, RunError> {
        let start_url = &self.config.run.start_url;
        url::Url::parse(start_url).map_err(|e| RunError::InvalidStartUrl {
            url: start_url.clone(),
            reason: e.to_string(),
        })?;

        if !surface.is_ready().await {
            surface.launch().await.map_err(RunError::Launch)?;
        }

        info!("Starting run for {}", self.config.run.app_name);
        info!("Start URL: {}", start_url);
        info!("Artifacts: {}", self.store.root().display());

        self.prepare(surface, start_url, session).await?;

        let mut summary = RunSummary::default();
        let total = plan.len();
        for (idx, plan_step) in plan.steps.iter().enumerate() {
            let step = idx + 1;
            info!("Step {}/{}: {}", step, total, plan_step.intent);
            info!("   Expected: {}", plan_step.expected_state);

            let result = match self.run_step(surface, step, plan_step).await {
                Ok(r) => r,
                Err(e) => {
                    error!("Surface lost during step {}: {}", step, e);
                    return Err(RunError::SurfaceLost(e));
                }
            };
            self.persist(&result).await;
            summary.push(result);

            if step < total {
                pause(self.config.run.step_settle_ms).await;
            }
        }

        if let Err(e) = self.store.write_run_json(SUMMARY_FILE, &summary).await {
            error!("Failed to persist run summary: {}", e);
        }
        info!(
            "Run finished: {}/{} verified, {} skipped, {} recovered",
            summary.verified,
            total,
            summary.skipped,
            summary.recovered
        );
        Ok(summary)
    }

    async fn prepare<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        start_url: &str,
        session: Option<&SessionState>,
    ) -> Result<(), SurfaceError> {
        if let Some(state) = session {
            match surface.restore_session(state).await {
                Ok(()) => info!("Session restored"),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("Session not restored: {}", e),
            }
        }

        match surface.navigate(start_url).await {
            Ok(nav) => info!("Navigated to {} ({})", nav.url, nav.title),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!("Navigation to {} failed: {}", start_url, e),
        }

        let workspace = Probe::RoleVisible {
            role: "main".into(),
            name: None,
        };
        let found = wait_for(
            surface,
            &workspace,
            Duration::from_millis(self.config.timing.workspace_wait_ms),
            self.config.timing.poll_interval(),
        )
        .await?;
        if found.is_some() {
            info!("Workspace loaded");
        } else {
            warn!("Main workspace not found; continuing");
        }
        Ok(())
    }

    /// One step from perception to final verdict.
    pub async fn run_step<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        step: usize,
        plan_step: &PlanStep,
    ) -> Result<StepResult, SurfaceError> {
        let intent = plan_step.intent.as_str();
        let expected = plan_step.expected_state.as_str();

        let snapshot = self.perceiver.capture(surface, step).await?;
        let scorer = CandidateScorer::new(intent);
        let Some(best) = scorer.best(&snapshot.elements) else {
            info!("No suitable element for step {}; skipping", step);
            return Ok(StepResult::skipped(step, plan_step));
        };
        info!(
            "Resolved step {} to {:?} (score {:.3})",
            step,
            best.element.display_label(),
            best.score
        );

        let mut action = self
            .executor
            .execute(surface, &best.element, intent, step)
            .await?;
        info!("Executor: {} | action={}", action.status, action.action);

        let mut verified = if action.is_success() {
            self.verifier.verify(surface, intent, expected).await?
        } else {
            false
        };

        let mut element = best.element.clone();
        let mut recovery = None;
        if !verified {
            let failed = FailedStep {
                step,
                intent,
                expected,
                avoid: Some(&best.element),
            };
            let outcome = self.recovery.recover(surface, failed).await?;
            recovery = Some(outcome.meta());
            if let (Some(recovered_on), Some(result)) = (outcome.element, outcome.result) {
                element = recovered_on;
                action = result;
                verified = self.verifier.verify(surface, intent, expected).await?;
            }
        }

        Ok(StepResult {
            step,
            intent: intent.to_string(),
            expected_state: expected.to_string(),
            element: Some(element),
            action: Some(action),
            verified,
            recovery,
        })
    }

    async fn persist(&self, result: &StepResult) {
        if let Err(e) = self
            .store
            .write_json(result.step, STEP_FILE, &result.to_record())
            .await
        {
            error!("Failed to persist step {}: {}", result.step, e);
        }
    }
}
