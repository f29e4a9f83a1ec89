#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use waypoint_engine::config::{RunConfig, TimingConfig, WaypointConfig};
use waypoint_engine::protocol::{
    Capture, ClassifiedAction, ElementRecord, Gesture, NavigationResult, Probe, ProbeOutcome,
    Rect, SessionState,
};
use waypoint_engine::surface::{Surface, SurfaceError};

/// How scripted probes misbehave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fault {
    Script,
    Disconnected,
}

impl Fault {
    fn error(self, what: &str) -> SurfaceError {
        match self {
            Fault::Script => SurfaceError::Script(format!("{} failed", what)),
            Fault::Disconnected => SurfaceError::Disconnected("target closed".into()),
        }
    }
}

/// A scripted surface. Captures are served from a queue; the last queued
/// snapshot is repeated once the queue runs dry.
#[derive(Debug, Default)]
pub struct MockSurface {
    pub snapshots: VecDeque<Vec<ElementRecord>>,
    pub last_snapshot: Vec<ElementRecord>,
    pub failing_boxes: Vec<Rect>,
    pub answers: Vec<(Probe, ProbeOutcome)>,
    pub probe_fault: Option<Fault>,
    pub dismissable: Vec<String>,
    pub url: String,
    /// Capture number (1-based) from which the surface is gone.
    pub lost_at_capture: Option<usize>,
    pub supports_sessions: bool,

    pub ready: bool,
    pub launched: bool,
    pub captures: usize,
    pub performed: Vec<(ElementRecord, ClassifiedAction)>,
    pub gestures: Vec<Gesture>,
    pub probes: Vec<Probe>,
    pub navigated: Vec<String>,
    pub restored: Option<SessionState>,
}

impl MockSurface {
    pub fn new(elements: Vec<ElementRecord>) -> Self {
        Self {
            last_snapshot: elements,
            ready: true,
            url: "https://app.example.com/home".into(),
            ..Default::default()
        }
    }

    /// Serve these snapshots in order before falling back to the default one.
    pub fn then_capture(mut self, elements: Vec<ElementRecord>) -> Self {
        self.snapshots.push_back(elements);
        self
    }

    pub fn failing(mut self, el: &ElementRecord) -> Self {
        self.failing_boxes.push(el.rect);
        self
    }

    pub fn answer(mut self, probe: Probe, outcome: ProbeOutcome) -> Self {
        self.answers.push((probe, outcome));
        self
    }

    pub fn count_probes(&self, probe: &Probe) -> usize {
        self.probes.iter().filter(|p| *p == probe).count()
    }

    pub fn escapes(&self) -> usize {
        self.gestures
            .iter()
            .filter(|g| matches!(g, Gesture::PressKey { key } if key == "Escape"))
            .count()
    }
}

#[async_trait]
impl Surface for MockSurface {
    async fn launch(&mut self) -> Result<(), SurfaceError> {
        self.launched = true;
        self.ready = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SurfaceError> {
        self.ready = false;
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.ready
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, SurfaceError> {
        self.navigated.push(url.to_string());
        self.url = url.to_string();
        Ok(NavigationResult {
            url: url.to_string(),
            title: "Mock".into(),
            status: 200,
        })
    }

    async fn restore_session(&mut self, session: &SessionState) -> Result<(), SurfaceError> {
        if !self.supports_sessions {
            return Err(SurfaceError::NotSupported("restore_session".into()));
        }
        self.restored = Some(session.clone());
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, SurfaceError> {
        Ok(self.url.clone())
    }

    async fn capture(&mut self) -> Result<Capture, SurfaceError> {
        self.captures += 1;
        if let Some(at) = self.lost_at_capture
            && self.captures >= at
        {
            return Err(SurfaceError::Disconnected("browser crashed".into()));
        }
        let elements = match self.snapshots.pop_front() {
            Some(next) => next,
            None => self.last_snapshot.clone(),
        };
        Ok(Capture {
            elements,
            ax_tree: serde_json::json!({ "role": "WebArea" }),
        })
    }

    async fn perform(
        &mut self,
        element: &ElementRecord,
        action: &ClassifiedAction,
    ) -> Result<(), SurfaceError> {
        self.performed.push((element.clone(), action.clone()));
        if self.failing_boxes.contains(&element.rect) {
            return Err(SurfaceError::Script("element is not clickable".into()));
        }
        Ok(())
    }

    async fn probe(&mut self, probe: &Probe) -> Result<ProbeOutcome, SurfaceError> {
        self.probes.push(probe.clone());
        if let Some(fault) = self.probe_fault {
            return Err(fault.error("probe"));
        }
        Ok(self
            .answers
            .iter()
            .find(|(p, _)| p == probe)
            .map(|(_, o)| o.clone())
            .unwrap_or_else(ProbeOutcome::missing))
    }

    async fn gesture(&mut self, gesture: &Gesture) -> Result<bool, SurfaceError> {
        self.gestures.push(gesture.clone());
        Ok(match gesture {
            Gesture::ClickByRole { name, .. } => self.dismissable.contains(name),
            _ => true,
        })
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, SurfaceError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

pub fn element(tag: &str, role: Option<&str>, text: &str, rect: Rect) -> ElementRecord {
    ElementRecord {
        tag: tag.into(),
        role: role.map(String::from),
        text: text.into(),
        visible: true,
        rect,
        ..Default::default()
    }
}

pub fn button(text: &str, x: f64, y: f64) -> ElementRecord {
    element("button", Some("button"), text, Rect::new(x, y, 120.0, 32.0))
}

pub fn textbox(label: &str, x: f64, y: f64) -> ElementRecord {
    ElementRecord {
        aria_label: label.into(),
        ..element("input", Some("textbox"), "", Rect::new(x, y, 240.0, 32.0))
    }
}

/// A plain `<input>` with no role or aria label. `text` is whatever the page
/// names it by (a `<label>` or its placeholder), empty when it has neither.
pub fn form_field(text: &str, x: f64, y: f64) -> ElementRecord {
    element("input", None, text, Rect::new(x, y, 240.0, 32.0))
}

pub fn dialog(text: &str, rect: Rect) -> ElementRecord {
    element("div", Some("dialog"), text, rect)
}

/// Config writing under `root` with no real waiting.
pub fn test_config(root: &std::path::Path) -> WaypointConfig {
    WaypointConfig {
        run: RunConfig {
            app_name: "demo".into(),
            start_url: "https://app.example.com/".into(),
            artifact_root: root.to_path_buf(),
            step_settle_ms: 0,
            ..Default::default()
        },
        timing: TimingConfig::immediate(),
        ..Default::default()
    }
}
