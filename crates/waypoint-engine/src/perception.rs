use crate::artifacts::{AX_TREE_FILE, ArtifactStore, PERCEPTION_FILE};
use crate::surface::{Surface, SurfaceError};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};
use waypoint_common::protocol::ElementRecord;

/// Elements thinner than this in either dimension are not interactable.
pub const MIN_SIDE: f64 = 2.0;

/// One step's view of the surface.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub step: usize,
    pub elements: Vec<ElementRecord>,
    /// Where the elements were persisted, if that succeeded.
    pub path: Option<PathBuf>,
}

type DedupKey = (
    String,
    Option<String>,
    String,
    String,
    String,
    String,
    i64,
    i64,
);

fn dedup_key(el: &ElementRecord) -> DedupKey {
    (
        el.tag.clone(),
        el.role.clone(),
        el.text.clone(),
        el.aria_label.clone(),
        el.title.clone(),
        el.tooltip.clone(),
        el.rect.x.round() as i64,
        el.rect.y.round() as i64,
    )
}

/// Keep visible, labelled, non-degenerate elements; drop repeats of an
/// element already seen at the same rounded position.
pub fn filter_elements(raw: Vec<ElementRecord>) -> Vec<ElementRecord> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|el| el.visible && el.rect.width >= MIN_SIDE && el.rect.height >= MIN_SIDE)
        .filter(|el| el.has_label())
        .filter(|el| seen.insert(dedup_key(el)))
        .collect()
}

/// Takes snapshots and persists them under the step's artifact directory.
#[derive(Debug, Clone)]
pub struct Perceiver {
    store: ArtifactStore,
}

impl Perceiver {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// A fresh snapshot for `step`. Re-capturing the same step overwrites its
    /// files. A non-fatal capture failure yields an empty snapshot.
    pub async fn capture<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        step: usize,
    ) -> Result<Snapshot, SurfaceError> {
        let capture = match surface.capture().await {
            Ok(c) => c,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Perception failed for step {}: {}", step, e);
                return Ok(Snapshot {
                    step,
                    ..Default::default()
                });
            }
        };

        let raw_count = capture.elements.len();
        let elements = filter_elements(capture.elements);
        info!(
            "Perceived {} element(s) for step {} ({} raw)",
            elements.len(),
            step,
            raw_count
        );

        let path = match self.store.write_json(step, PERCEPTION_FILE, &elements).await {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Failed to persist perception for step {}: {}", step, e);
                None
            }
        };
        if let Err(e) = self.store.write_json(step, AX_TREE_FILE, &capture.ax_tree).await {
            warn!("Failed to persist accessibility tree for step {}: {}", step, e);
        }

        Ok(Snapshot {
            step,
            elements,
            path,
        })
    }
}
