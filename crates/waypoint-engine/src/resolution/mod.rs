//! Intent-to-element resolution: ranks a perception snapshot against one intent.

pub mod dialog;
pub mod features;

pub use dialog::DialogBounds;
pub use features::{EXCLUDED_SCORE, Features};

use crate::normalizer::NormalizedIntent;
use serde::Serialize;
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, warn};
use waypoint_common::formatter::format_candidates;
use waypoint_common::protocol::ElementRecord;

/// An element paired with its score for one intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub score: f64,
    pub features: Features,
    pub element: ElementRecord,
}

/// Ranks snapshots for a single intent.
#[derive(Debug, Clone)]
pub struct CandidateScorer {
    intent: NormalizedIntent,
}

impl CandidateScorer {
    pub fn new(intent: &str) -> Self {
        Self {
            intent: NormalizedIntent::new(intent),
        }
    }

    pub fn intent(&self) -> &NormalizedIntent {
        &self.intent
    }

    /// Score of one element, or [`EXCLUDED_SCORE`] when it may never be chosen.
    pub fn score_element(&self, el: &ElementRecord, dialog: Option<&DialogBounds>) -> f64 {
        Features::extract(&self.intent, el, dialog)
            .map(|f| f.score())
            .unwrap_or(EXCLUDED_SCORE)
    }

    /// All eligible elements, best first. Equal scores keep snapshot order.
    pub fn rank(&self, elements: &[ElementRecord]) -> Vec<ScoredCandidate> {
        let dialog = DialogBounds::detect(elements);
        let mut ranked: Vec<ScoredCandidate> = elements
            .iter()
            .filter_map(|el| {
                Features::extract(&self.intent, el, dialog.as_ref()).map(|features| {
                    ScoredCandidate {
                        score: features.score(),
                        features,
                        element: el.clone(),
                    }
                })
            })
            .collect();

        // sort_by is stable
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        debug!(
            intent = %self.intent.raw,
            dialog = dialog.is_some(),
            "ranked {} of {} element(s)\n{}",
            ranked.len(),
            elements.len(),
            format_candidates(ranked.iter().take(5).map(|c| (c.score, &c.element)))
        );
        ranked
    }

    pub fn best(&self, elements: &[ElementRecord]) -> Option<ScoredCandidate> {
        self.rank(elements).into_iter().next()
    }

    /// First `k` of the ranking; `k` is clamped to at least 1.
    pub fn top_k(&self, elements: &[ElementRecord], k: usize) -> Vec<ScoredCandidate> {
        let mut ranked = self.rank(elements);
        ranked.truncate(k.max(1));
        ranked
    }

    /// Rank a persisted `perception.json`. An unreadable or malformed file
    /// yields no candidates.
    pub async fn rank_path(&self, path: &Path) -> Vec<ScoredCandidate> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read perception at {}: {}", path.display(), e);
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<ElementRecord>>(&content) {
            Ok(elements) => self.rank(&elements),
            Err(e) => {
                warn!("Failed to parse perception at {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }
}
