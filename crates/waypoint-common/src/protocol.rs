use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Perception output stores absent attributes as `null`; treat them as empty.
fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_visible() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Axis-aligned bounding box in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    #[serde(default, deserialize_with = "nullable_f64")]
    pub x: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub y: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub width: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// True when `inner` lies fully within `self`, edges included.
    pub fn contains(&self, inner: &Rect) -> bool {
        inner.x >= self.x
            && inner.y >= self.y
            && inner.x + inner.width <= self.x + self.width
            && inner.y + inner.height <= self.y + self.height
    }
}

/// One visible interactive element as seen by a single perception snapshot.
///
/// Records are only meaningful for the snapshot that produced them; a later
/// capture may move or drop the same element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementRecord {
    #[serde(default, deserialize_with = "nullable_string")]
    pub tag: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub text: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub aria_label: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub tooltip: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub editable: bool,
    #[serde(flatten)]
    pub rect: Rect,
}

impl ElementRecord {
    /// The four label-bearing fields, trimmed, in scoring order.
    pub fn label_fields(&self) -> [&str; 4] {
        [
            self.text.trim(),
            self.aria_label.trim(),
            self.title.trim(),
            self.tooltip.trim(),
        ]
    }

    pub fn has_label(&self) -> bool {
        self.label_fields().iter().any(|f| !f.is_empty())
    }

    /// Best human-readable name: text, then aria-label, then title.
    pub fn display_label(&self) -> &str {
        let [text, aria, title, _] = self.label_fields();
        [text, aria, title]
            .into_iter()
            .find(|f| !f.is_empty())
            .unwrap_or("")
    }

    pub fn role_lower(&self) -> String {
        self.role.as_deref().unwrap_or("").to_lowercase()
    }

    pub fn tag_lower(&self) -> String {
        self.tag.to_lowercase()
    }

    pub fn is_dialog(&self) -> bool {
        self.role_lower() == "dialog"
    }

    /// Elements that can receive typed text.
    pub fn is_textbox_like(&self) -> bool {
        matches!(self.role_lower().as_str(), "textbox" | "combobox")
            || matches!(self.tag_lower().as_str(), "input" | "textarea")
            || self.editable
    }

    /// Bounding boxes are the identity used to avoid re-trying a failed element.
    pub fn same_box(&self, other: &ElementRecord) -> bool {
        self.rect == other.rect
    }
}

/// Raw result of one perception pass over the surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capture {
    #[serde(default)]
    pub elements: Vec<ElementRecord>,
    #[serde(default)]
    pub ax_tree: serde_json::Value,
}

/// Instantaneous questions asked of the live surface. Waiting is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "probe", rename_all = "snake_case")]
pub enum Probe {
    /// Any dialog-role element is present.
    DialogPresent,
    /// Visible text of the first dialog-role element.
    DialogText,
    /// Value (or editable text) of the first textbox-like element.
    Textbox { prefer_dialog: bool },
    /// An element with this role (and accessible name, if given) is visible.
    RoleVisible {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// This text is rendered visibly, matched exactly or as a substring.
    TextVisible { text: String, exact: bool },
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::DialogPresent => write!(f, "dialog present"),
            Probe::DialogText => write!(f, "dialog text"),
            Probe::Textbox { prefer_dialog } => write!(f, "textbox (prefer dialog: {prefer_dialog})"),
            Probe::RoleVisible { role, name } => match name {
                Some(n) => write!(f, "{role} '{n}' visible"),
                None => write!(f, "{role} visible"),
            },
            Probe::TextVisible { text, exact } => {
                write!(f, "text '{text}' visible (exact: {exact})")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ProbeOutcome {
    pub fn found() -> Self {
        Self {
            found: true,
            text: None,
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            found: true,
            text: Some(text.into()),
        }
    }
}

/// Best-effort nudges applied to the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gesture", rename_all = "snake_case")]
pub enum Gesture {
    ScrollToTop,
    Wheel { delta_y: f64 },
    PressKey { key: String },
    ClickByRole { role: String, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    Fill,
    Open,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Click => "click",
            ActionKind::Fill => "fill",
            ActionKind::Open => "open",
        };
        f.write_str(s)
    }
}

/// An intent reduced to something a surface can actuate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedAction {
    pub kind: ActionKind,
    /// Text to type for fills.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Preferred visible label for clicks and opens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Fail,
    SkippedNoElement,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Fail => "fail",
            ExecutionStatus::SkippedNoElement => "skipped_no_element",
        };
        f.write_str(s)
    }
}

/// What happened when an action was dispatched to the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorResult {
    pub status: ExecutionStatus,
    pub action: ActionKind,
    pub intent: String,
    pub label: Option<String>,
    pub aria_label: Option<String>,
    pub used_text: Option<String>,
    pub tag: Option<String>,
    pub error: Option<String>,
}

impl ExecutorResult {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
    pub status: u16,
}

/// Diagnostic slice of the executor result kept in the persisted step record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorMeta {
    pub action: ActionKind,
    pub used_text: Option<String>,
    pub tag: Option<String>,
    pub label: Option<String>,
    pub aria_label: Option<String>,
    pub error: Option<String>,
}

impl From<&ExecutorResult> for ExecutorMeta {
    fn from(result: &ExecutorResult) -> Self {
        Self {
            action: result.action,
            used_text: result.used_text.clone(),
            tag: result.tag.clone(),
            label: result.label.clone(),
            aria_label: result.aria_label.clone(),
            error: result.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryMeta {
    pub recovered: bool,
    pub attempts_used: u32,
}

/// The `step.json` record written once per plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_id: usize,
    pub intent: String,
    pub expected_state: String,
    pub executor_status: ExecutionStatus,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_meta: Option<ExecutorMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery: Option<RecoveryMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<StorageEntry>,
}

/// Pre-authenticated browser state used to bootstrap the surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    #[serde(default)]
    pub origins: Vec<OriginState>,
}
