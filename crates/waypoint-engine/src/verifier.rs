//! Outcome verification. An expected-outcome string is routed to exactly one
//! check, chosen by a fixed keyword precedence, and the check is run against
//! the live surface.

use crate::config::TimingConfig;
use crate::normalizer::extract_quoted;
use crate::surface::{Surface, SurfaceError};
use crate::wait::wait_for;
use std::time::Duration;
use tracing::{debug, info};
use waypoint_common::protocol::Probe;

const DIALOG_WORDS: &[&str] = &["dialog", "modal", "prompt"];
const URL_WORDS: &[&str] = &["url", "location", "path", "navigate"];
const FIELD_WORDS: &[&str] = &["field", "input", "textbox", "editor"];
const VALUE_WORDS: &[&str] = &["contains", "set to", "value", "filled"];
const ROLE_WORDS: &[&str] = &["button", "link", "menuitem", "tab"];
const VISIBILITY_WORDS: &[&str] = &[
    "visible",
    "appears",
    "shown",
    "displayed",
    "listed",
    "present",
];

fn mentions(haystack: &str, words: &[&str]) -> bool {
    words.iter().any(|w| haystack.contains(w))
}

/// The single check an expected outcome is routed to.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// A dialog is open, optionally containing this text.
    Dialog { must_contain: Option<String> },
    /// The current location contains this fragment.
    Url { fragment: String },
    /// A textbox holds this value, or merely exists.
    Textbox { expected: Option<String> },
    /// An element with this role and accessible name becomes visible.
    Role { role: String, name: String },
    /// This text becomes visible.
    TextVisible { text: String },
    /// At least one of these becomes visible.
    AnyLiteral { literals: Vec<String> },
    /// Nothing verifiable was asserted.
    Assume,
}

impl Strategy {
    /// Route an outcome. Literals come from the outcome, or the intent when
    /// the outcome has none.
    pub fn classify(intent: &str, expected: &str) -> Self {
        let outcome = expected.trim().to_lowercase();
        let mut literals = extract_quoted(expected);
        if literals.is_empty() {
            literals = extract_quoted(intent);
        }
        let first = literals.first().cloned();

        if mentions(&outcome, DIALOG_WORDS) {
            return Strategy::Dialog {
                must_contain: first,
            };
        }
        if mentions(&outcome, URL_WORDS)
            && let Some(fragment) = first.clone()
        {
            return Strategy::Url { fragment };
        }
        if mentions(&outcome, FIELD_WORDS) && mentions(&outcome, VALUE_WORDS) {
            return Strategy::Textbox { expected: first };
        }
        if let Some(name) = first.clone() {
            if let Some(role) = ROLE_WORDS.iter().find(|r| outcome.contains(*r)) {
                return Strategy::Role {
                    role: role.to_string(),
                    name,
                };
            }
            if mentions(&outcome, VISIBILITY_WORDS) {
                return Strategy::TextVisible { text: name };
            }
            return Strategy::AnyLiteral { literals };
        }
        Strategy::Assume
    }
}

/// Runs the routed check with bounded waits.
#[derive(Debug, Clone)]
pub struct Verifier {
    timing: TimingConfig,
}

impl Verifier {
    pub fn new(timing: TimingConfig) -> Self {
        Self { timing }
    }

    /// Verdict for one step. Only a fatal surface error escapes; every other
    /// probe failure makes the verdict `false`.
    pub async fn verify<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        intent: &str,
        expected: &str,
    ) -> Result<bool, SurfaceError> {
        let strategy = Strategy::classify(intent, expected);
        debug!("Verifying {:?} for '{}'", strategy, expected);

        let verdict = match &strategy {
            Strategy::Dialog { must_contain } => {
                self.dialog_open(surface, must_contain.as_deref()).await?
            }
            Strategy::Url { fragment } => self.url_contains(surface, fragment).await?,
            Strategy::Textbox { expected } => {
                self.textbox_value(surface, expected.as_deref()).await?
            }
            Strategy::Role { role, name } => self.role_visible(surface, role, name).await?,
            Strategy::TextVisible { text } => self.text_visible(surface, text).await?,
            Strategy::AnyLiteral { literals } => {
                let mut any = false;
                for lit in literals {
                    if self.text_visible(surface, lit).await? {
                        any = true;
                        break;
                    }
                }
                any
            }
            Strategy::Assume => true,
        };

        info!("Verification {} for '{}'", if verdict { "passed" } else { "failed" }, expected);
        Ok(verdict)
    }

    async fn probe_within<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        probe: Probe,
        wait_ms: u64,
    ) -> Result<Option<String>, SurfaceError> {
        let outcome = wait_for(
            surface,
            &probe,
            Duration::from_millis(wait_ms),
            self.timing.poll_interval(),
        )
        .await?;
        Ok(outcome.map(|o| o.text.unwrap_or_default()))
    }

    async fn dialog_open<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        must_contain: Option<&str>,
    ) -> Result<bool, SurfaceError> {
        if self
            .probe_within(surface, Probe::DialogPresent, self.timing.dialog_wait_ms)
            .await?
            .is_none()
        {
            return Ok(false);
        }
        let Some(needle) = must_contain else {
            return Ok(true);
        };
        let text = self.probe_within(surface, Probe::DialogText, 0).await?;
        Ok(text.is_some_and(|t| t.to_lowercase().contains(&needle.to_lowercase())))
    }

    async fn url_contains<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        fragment: &str,
    ) -> Result<bool, SurfaceError> {
        match surface.current_url().await {
            Ok(url) => Ok(url.to_lowercase().contains(&fragment.to_lowercase())),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                debug!("Could not read current url: {}", e);
                Ok(false)
            }
        }
    }

    async fn textbox_value<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        expected: Option<&str>,
    ) -> Result<bool, SurfaceError> {
        let Some(expected) = expected else {
            let exists = self
                .probe_within(
                    surface,
                    Probe::Textbox {
                        prefer_dialog: false,
                    },
                    0,
                )
                .await?;
            return Ok(exists.is_some());
        };
        let value = self
            .probe_within(
                surface,
                Probe::Textbox {
                    prefer_dialog: true,
                },
                self.timing.textbox_wait_ms,
            )
            .await?;
        Ok(value.is_some_and(|v| {
            !v.trim().is_empty() && v.to_lowercase().contains(&expected.to_lowercase())
        }))
    }

    async fn role_visible<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        role: &str,
        name: &str,
    ) -> Result<bool, SurfaceError> {
        let probe = Probe::RoleVisible {
            role: role.to_string(),
            name: Some(name.to_string()),
        };
        Ok(self
            .probe_within(surface, probe, self.timing.visible_wait_ms)
            .await?
            .is_some())
    }

    /// Exact match first, then substring.
    async fn text_visible<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        text: &str,
    ) -> Result<bool, SurfaceError> {
        let exact = Probe::TextVisible {
            text: text.to_string(),
            exact: true,
        };
        if self.probe_within(surface, exact, 0).await?.is_some() {
            return Ok(true);
        }
        let contains = Probe::TextVisible {
            text: text.to_string(),
            exact: false,
        };
        Ok(self
            .probe_within(surface, contains, self.timing.visible_wait_ms)
            .await?
            .is_some())
    }
}
