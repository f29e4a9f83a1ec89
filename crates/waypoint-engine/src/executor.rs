use crate::artifacts::{AFTER_FILE, ArtifactStore, BEFORE_FILE};
use crate::config::ExecutorConfig;
use crate::normalizer::extract_quoted;
use crate::surface::{Surface, SurfaceError};
use crate::wait::pause;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use waypoint_common::protocol::{
    ActionKind, ClassifiedAction, ElementRecord, ExecutionStatus, ExecutorResult,
};

const FILL_WORDS: &[&str] = &["fill", "enter", "type", "input"];
const OPEN_WORDS: &[&str] = &["open", "navigate", "go to"];

lazy_static! {
    static ref ARIA_LABEL_RE: Regex = Regex::new(r#"(?i)aria-label=['"]([^'"]+)['"]"#).unwrap();
}

/// An explicit `aria-label='...'` reference inside an intent.
pub fn extract_aria_label(intent: &str) -> Option<String> {
    ARIA_LABEL_RE
        .captures(intent)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Reduce an intent to click, fill or open. Keyword order matters: fill words
/// are checked before open words.
pub fn classify_action(intent: &str, defaults: &ExecutorConfig) -> ClassifiedAction {
    let lower = intent.to_lowercase();
    let literal = extract_quoted(intent).into_iter().next();
    let aria_label = extract_aria_label(intent);

    if FILL_WORDS.iter().any(|w| lower.contains(w)) {
        let value = literal.unwrap_or_else(|| {
            if lower.contains("name") {
                defaults.default_name_value.clone()
            } else {
                defaults.default_fill_value.clone()
            }
        });
        return ClassifiedAction {
            kind: ActionKind::Fill,
            value: Some(value),
            label: None,
            aria_label,
        };
    }

    let kind = if OPEN_WORDS.iter().any(|w| lower.contains(w)) {
        ActionKind::Open
    } else {
        ActionKind::Click
    };
    ClassifiedAction {
        kind,
        value: None,
        label: literal,
        aria_label,
    }
}

/// Dispatches classified actions to the surface and records before/after state.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    store: ArtifactStore,
    defaults: ExecutorConfig,
    settle_ms: u64,
}

impl ActionExecutor {
    pub fn new(store: ArtifactStore, defaults: ExecutorConfig, settle_ms: u64) -> Self {
        Self {
            store,
            defaults,
            settle_ms,
        }
    }

    /// Act on `element` for `intent`. A non-fatal failure is reported as a
    /// `fail` result; only a fatal surface error is returned as `Err`.
    pub async fn execute<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        element: &ElementRecord,
        intent: &str,
        step: usize,
    ) -> Result<ExecutorResult, SurfaceError> {
        let action = classify_action(intent, &self.defaults);
        info!(
            "Executing {} on {:?} for step {}",
            action.kind,
            element.display_label(),
            step
        );

        self.snap(surface, step, BEFORE_FILE).await?;

        let error = match surface.perform(element, &action).await {
            Ok(()) => {
                pause(self.settle_ms).await;
                None
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Action {} failed on step {}: {}", action.kind, step, e);
                Some(e.to_string())
            }
        };

        self.snap(surface, step, AFTER_FILE).await?;

        let status = if error.is_none() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Fail
        };

        Ok(ExecutorResult {
            status,
            action: action.kind,
            intent: intent.to_string(),
            label: action.label,
            aria_label: action.aria_label,
            used_text: Some(element.text.clone()),
            tag: Some(element.tag.clone()),
            error,
        })
    }

    async fn snap<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        step: usize,
        name: &str,
    ) -> Result<(), SurfaceError> {
        match surface.screenshot().await {
            Ok(bytes) => {
                if let Err(e) = self.store.write_bytes(step, name, &bytes).await {
                    warn!("Failed to store {} for step {}: {}", name, step, e);
                }
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Screenshot {} skipped for step {}: {}", name, step, e);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_takes_literal_or_defaults() {
        let d = ExecutorConfig::default();
        let a = classify_action("Type 'Roadmap' into the name field", &d);
        assert_eq!(a.kind, ActionKind::Fill);
        assert_eq!(a.value.as_deref(), Some("Roadmap"));

        let a = classify_action("Enter a project name", &d);
        assert_eq!(a.value.as_deref(), Some("Demo Project"));

        let a = classify_action("Fill the description", &d);
        assert_eq!(a.value.as_deref(), Some("Test Value"));
        assert_eq!(a.label, None);
    }

    #[test]
    fn open_and_click_carry_label() {
        let d = ExecutorConfig::default();
        let a = classify_action("Go to 'Settings'", &d);
        assert_eq!(a.kind, ActionKind::Open);
        assert_eq!(a.label.as_deref(), Some("Settings"));

        let a = classify_action("Press 'Save'", &d);
        assert_eq!(a.kind, ActionKind::Click);
        assert_eq!(a.label.as_deref(), Some("Save"));
    }

    #[test]
    fn aria_label_is_extracted() {
        let d = ExecutorConfig::default();
        let a = classify_action("Click the button with aria-label='Project actions'", &d);
        assert_eq!(a.aria_label.as_deref(), Some("Project actions"));
        assert_eq!(extract_aria_label("click save"), None);
    }
}
