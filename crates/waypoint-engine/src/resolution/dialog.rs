use waypoint_common::protocol::{ElementRecord, Rect};

/// Dialogs this small or smaller are ignored when looking for the active one.
pub const MIN_DIALOG_SIDE: f64 = 10.0;

/// Bounding box of the most prominent open dialog in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialogBounds(pub Rect);

impl DialogBounds {
    /// Largest dialog-role element wider and taller than [`MIN_DIALOG_SIDE`].
    /// On equal area the earlier element wins.
    pub fn detect(elements: &[ElementRecord]) -> Option<Self> {
        let mut best: Option<Rect> = None;
        for el in elements.iter().filter(|e| e.is_dialog()) {
            let rect = el.rect;
            if rect.width <= MIN_DIALOG_SIDE || rect.height <= MIN_DIALOG_SIDE {
                continue;
            }
            match best {
                Some(current) if rect.area() <= current.area() => {}
                _ => best = Some(rect),
            }
        }
        best.map(DialogBounds)
    }

    pub fn contains(&self, el: &ElementRecord) -> bool {
        self.0.contains(&el.rect)
    }
}
