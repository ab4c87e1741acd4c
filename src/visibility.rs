//! Viewport visibility tracking.
//!
//! Views do their initial work (first fetch, deferred entity load) only once they
//! are on screen. Visibility is read synchronously while rendering: the page
//! computes whether the view's area intersects the frame and reports it through
//! [`Visibility::update`], which turns the raw flag into edges.

use ratatui::layout::Rect;

/// Edge produced by a visibility update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityChange {
    Unchanged,
    /// The component became visible. `first` is set the first time only.
    Shown { first: bool },
    Hidden,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Visibility {
    visible: bool,
    ever_shown: bool,
}

impl Visibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current visibility and reports what changed.
    pub fn update(&mut self, visible: bool) -> VisibilityChange {
        match (self.visible, visible) {
            (false, true) => {
                let first = !self.ever_shown;
                self.visible = true;
                self.ever_shown = true;
                VisibilityChange::Shown { first }
            }
            (true, false) => {
                self.visible = false;
                VisibilityChange::Hidden
            }
            _ => VisibilityChange::Unchanged,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the component has ever been on screen.
    pub fn ever_shown(&self) -> bool {
        self.ever_shown
    }
}

/// Returns `true` when `area` covers at least one cell of `viewport`.
pub fn intersects(area: Rect, viewport: Rect) -> bool {
    !area.intersection(viewport).is_empty()
}
