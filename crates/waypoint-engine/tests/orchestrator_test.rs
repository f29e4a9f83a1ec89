mod common;

use common::{MockSurface, button, dialog, element, form_field, test_config, textbox};
use waypoint_engine::artifacts::{
    AFTER_FILE, AX_TREE_FILE, BEFORE_FILE, PERCEPTION_FILE, STEP_FILE, SUMMARY_FILE,
};
use waypoint_engine::orchestrator::{Orchestrator, RunError};
use waypoint_engine::plan::{Plan, PlanStep};
use waypoint_engine::protocol::{
    Cookie, ExecutionStatus, Probe, ProbeOutcome, Rect, SessionState, StepRecord,
};

fn step(intent: &str, expected: &str) -> PlanStep {
    PlanStep {
        intent: intent.into(),
        expected_state: expected.into(),
    }
}

fn read_record(root: &std::path::Path, step: usize) -> StepRecord {
    let path = root.join(format!("step_{}", step)).join(STEP_FILE);
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn runs_every_step_and_persists_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(test_config(dir.path()));

    let create = button("Create Project", 20.0, 20.0);
    let modal = dialog("New Project Name Create", Rect::new(300.0, 100.0, 500.0, 400.0));
    let name = textbox("Project Name", 340.0, 200.0);
    // step 1 sees only the button, step 2 sees the opened dialog
    let mut surface = MockSurface::new(vec![create.clone(), modal, name.clone()])
        .then_capture(vec![create])
        .answer(Probe::DialogPresent, ProbeOutcome::found())
        .answer(Probe::DialogText, ProbeOutcome::with_text("New Project"))
        .answer(
            Probe::Textbox {
                prefer_dialog: true,
            },
            ProbeOutcome::with_text("Roadmap"),
        );

    let plan = Plan::new(vec![
        step("Click 'Create Project'", "A dialog titled 'New Project' is shown"),
        step("Type 'Roadmap' into the name field", "the name field contains 'Roadmap'"),
    ]);
    let summary = orchestrator.run(&mut surface, &plan, None).await.unwrap();

    assert_eq!(summary.steps.len(), 2);
    assert_eq!(summary.verified, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.recovered, 0);
    assert_eq!(surface.navigated, vec!["https://app.example.com/".to_string()]);

    let fill = &surface.performed[1];
    assert_eq!(fill.0, name);
    assert_eq!(fill.1.value.as_deref(), Some("Roadmap"));

    for n in 1..=2 {
        let step_dir = dir.path().join(format!("step_{}", n));
        for file in [PERCEPTION_FILE, AX_TREE_FILE, BEFORE_FILE, AFTER_FILE, STEP_FILE] {
            assert!(step_dir.join(file).exists(), "missing {} for step {}", file, n);
        }
    }
    assert!(dir.path().join(SUMMARY_FILE).exists());

    let record = read_record(dir.path(), 1);
    assert_eq!(record.step_id, 1);
    assert_eq!(record.executor_status, ExecutionStatus::Success);
    assert!(record.verified);
    let meta = record.executor_meta.expect("executor meta");
    assert_eq!(meta.used_text.as_deref(), Some("Create Project"));
    assert_eq!(meta.tag.as_deref(), Some("button"));
    assert!(record.recovery.is_none());
}

#[tokio::test]
async fn fill_without_textbox_is_skipped_without_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(test_config(dir.path()));

    let mut surface = MockSurface::new(vec![
        button("Project Name", 0.0, 0.0),
        button("Next", 0.0, 60.0),
    ]);
    let plan = Plan::new(vec![
        step("Fill 'Project Name' field", "the name field contains 'Project Name'"),
        step("Click next", "the wizard advances"),
    ]);
    let summary = orchestrator.run(&mut surface, &plan, None).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.steps[0].status(), ExecutionStatus::SkippedNoElement);
    assert!(summary.steps[0].recovery.is_none());
    // the run went on to step 2
    assert_eq!(summary.steps[1].status(), ExecutionStatus::Success);
    assert!(summary.steps[1].verified);
    assert_eq!(surface.performed.len(), 1);
    assert!(surface.gestures.is_empty());

    let record = read_record(dir.path(), 1);
    assert_eq!(record.executor_status, ExecutionStatus::SkippedNoElement);
    assert!(!record.verified);
    assert!(record.executor_meta.is_none());

    let raw = std::fs::read_to_string(dir.path().join("step_1").join(STEP_FILE)).unwrap();
    assert!(raw.contains("\"skipped_no_element\""));
}

#[tokio::test]
async fn fill_targets_input_named_only_by_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(test_config(dir.path()));

    let modal = dialog("New Project", Rect::new(300.0, 100.0, 500.0, 400.0));
    let name = form_field("Project name", 340.0, 200.0);
    let create = button("Create", 340.0, 300.0);
    let mut surface = MockSurface::new(vec![modal, name.clone(), create]).answer(
        Probe::Textbox {
            prefer_dialog: true,
        },
        ProbeOutcome::with_text("Project Name"),
    );

    let plan = Plan::new(vec![step(
        "Fill 'Project Name' field",
        "the name field contains 'Project Name'",
    )]);
    let summary = orchestrator.run(&mut surface, &plan, None).await.unwrap();

    let result = &summary.steps[0];
    assert_eq!(summary.skipped, 0);
    assert_eq!(result.status(), ExecutionStatus::Success);
    assert!(result.verified);
    assert_eq!(result.element.as_ref(), Some(&name));
    assert_eq!(surface.performed.len(), 1);
    assert_eq!(surface.performed[0].0, name);
    assert_eq!(surface.performed[0].1.value.as_deref(), Some("Project Name"));
}

#[tokio::test]
async fn nameless_input_is_not_a_fill_target() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(test_config(dir.path()));

    let mut surface = MockSurface::new(vec![form_field("", 0.0, 0.0), button("Create", 0.0, 60.0)]);
    let plan = Plan::new(vec![step("Fill 'Project Name' field", "")]);
    let summary = orchestrator.run(&mut surface, &plan, None).await.unwrap();

    // an input the page gives no name at all never reaches the scorer
    assert_eq!(summary.steps[0].status(), ExecutionStatus::SkippedNoElement);
    assert!(surface.performed.is_empty());
}

#[tokio::test]
async fn failed_action_is_recovered_and_reverified() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(test_config(dir.path()));

    let stale = button("Publish", 0.0, 0.0);
    let fresh = element("a", Some("link"), "Publish", Rect::new(0.0, 80.0, 90.0, 24.0));
    let mut surface = MockSurface::new(vec![stale.clone(), fresh.clone()])
        .failing(&stale)
        .answer(
            Probe::TextVisible {
                text: "Published".into(),
                exact: true,
            },
            ProbeOutcome::found(),
        );

    let plan = Plan::new(vec![step("Click 'Publish'", "'Published' is shown")]);
    let summary = orchestrator.run(&mut surface, &plan, None).await.unwrap();

    let result = &summary.steps[0];
    assert!(result.verified);
    assert!(result.was_recovered());
    assert_eq!(result.status(), ExecutionStatus::Success);
    assert_eq!(summary.recovered, 1);
    // the recorded element is the one the adopted action landed on
    assert_eq!(result.element.as_ref(), Some(&fresh));
    assert_eq!(
        result.action.as_ref().and_then(|a| a.tag.as_deref()),
        Some("a")
    );

    let record = read_record(dir.path(), 1);
    let recovery = record.recovery.expect("recovery meta");
    assert!(recovery.recovered);
    assert_eq!(recovery.attempts_used, 1);
    assert_eq!(
        record.executor_meta.and_then(|m| m.tag).as_deref(),
        Some("a")
    );
}

#[tokio::test]
async fn unverified_step_is_recorded_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(test_config(dir.path()));

    let mut surface = MockSurface::new(vec![button("Export", 0.0, 0.0), button("Done", 0.0, 60.0)]);
    let plan = Plan::new(vec![
        step("Click 'Export'", "'Export complete' is shown"),
        step("Click done", "nothing in particular"),
    ]);
    let summary = orchestrator.run(&mut surface, &plan, None).await.unwrap();

    assert!(!summary.steps[0].verified);
    let recovery = summary.steps[0].recovery.expect("recovery ran");
    // recovery only needs an action that succeeds, so "Done" counts even though
    // the step stays unverified
    assert!(recovery.recovered);
    assert!(summary.steps[1].verified);
    assert_eq!(summary.verified, 1);

    let record = read_record(dir.path(), 1);
    assert!(!record.verified);
    assert_eq!(record.executor_status, ExecutionStatus::Success);
}

#[tokio::test]
async fn invalid_start_url_is_rejected_before_launch() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.run.start_url = "not a url".into();
    let orchestrator = Orchestrator::new(config);

    let mut surface = MockSurface::new(vec![]);
    surface.ready = false;
    let err = orchestrator
        .run(&mut surface, &Plan::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::InvalidStartUrl { .. }));
    assert!(!surface.launched);
    assert!(surface.navigated.is_empty());
}

#[tokio::test]
async fn surface_is_launched_and_session_restored() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(test_config(dir.path()));

    let session = SessionState {
        cookies: vec![Cookie {
            name: "sid".into(),
            value: "abc".into(),
            domain: Some("app.example.com".into()),
            path: Some("/".into()),
            expires: None,
            http_only: Some(true),
            secure: Some(true),
        }],
        origins: vec![],
    };

    let mut surface = MockSurface::new(vec![]);
    surface.ready = false;
    surface.supports_sessions = true;
    orchestrator
        .run(&mut surface, &Plan::default(), Some(&session))
        .await
        .unwrap();
    assert!(surface.launched);
    assert_eq!(surface.restored, Some(session));
}

#[tokio::test]
async fn unsupported_session_restore_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(test_config(dir.path()));
    let mut surface = MockSurface::new(vec![button("Go", 0.0, 0.0)]);

    let plan = Plan::new(vec![step("Click go", "")]);
    let summary = orchestrator
        .run(&mut surface, &plan, Some(&SessionState::default()))
        .await
        .unwrap();
    assert_eq!(summary.verified, 1);
}

#[tokio::test]
async fn lost_surface_ends_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(test_config(dir.path()));

    let mut surface = MockSurface::new(vec![button("Next", 0.0, 0.0)]);
    surface.lost_at_capture = Some(2);
    let plan = Plan::new(vec![
        step("Click next", ""),
        step("Click next", ""),
        step("Click next", ""),
    ]);

    let err = orchestrator.run(&mut surface, &plan, None).await.unwrap_err();
    assert!(matches!(err, RunError::SurfaceLost(_)));
    // the step finished before the fault is still on disk
    assert!(read_record(dir.path(), 1).verified);
    assert!(!dir.path().join("step_2").join(STEP_FILE).exists());
    assert!(!dir.path().join(SUMMARY_FILE).exists());
}

#[tokio::test]
async fn empty_snapshot_skips_every_step() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(test_config(dir.path()));
    let mut surface = MockSurface::new(vec![]);

    let plan = Plan::new(vec![step("Click 'A'", ""), step("Click 'B'", "")]);
    let summary = orchestrator.run(&mut surface, &plan, None).await.unwrap();
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.verified, 0);
    assert_eq!(summary.records().len(), 2);
}
