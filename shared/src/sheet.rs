//! Gesture state machine for the results sheet.
//!
//! Only the net vertical displacement at the end of a drag decides the next
//! snap position; intermediate finger positions only move the sheet
//! visually.

use serde::{Deserialize, Serialize};

use crate::config::SheetConfig;
use crate::selection::SheetPosition;

/// `net_up_px` is positive when the finger moved up the screen.
#[must_use]
pub fn next_position(current: SheetPosition, net_up_px: f64, threshold_px: f64) -> SheetPosition {
    if !net_up_px.is_finite() {
        return current;
    }
    if net_up_px > threshold_px {
        current.up()
    } else if net_up_px < -threshold_px {
        current.down()
    } else {
        current
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    start_y: f64,
    current_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SheetLayout {
    pub position: SheetPosition,
    pub height_px: f64,
    pub dragging: bool,
    /// Shells animate height changes only when set.
    pub animate: bool,
}

#[derive(Debug, Clone)]
pub struct BottomSheetController {
    config: SheetConfig,
    position: SheetPosition,
    viewport_height_px: f64,
    chrome_height_px: f64,
    drag: Option<Drag>,
}

impl BottomSheetController {
    #[must_use]
    pub const fn new(config: SheetConfig, position: SheetPosition) -> Self {
        Self {
            config,
            position,
            viewport_height_px: 0.0,
            chrome_height_px: 0.0,
            drag: None,
        }
    }

    #[must_use]
    pub const fn position(&self) -> SheetPosition {
        self.position
    }

    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Re-measures the viewport and the navigation chrome reserved below the
    /// sheet. Called on resize and orientation change.
    pub fn resize(&mut self, viewport_height_px: f64, chrome_height_px: f64) {
        self.viewport_height_px = sanitize(viewport_height_px);
        self.chrome_height_px = sanitize(chrome_height_px);
    }

    pub fn drag_start(&mut self, y: f64) {
        if y.is_finite() {
            self.drag = Some(Drag {
                start_y: y,
                current_y: y,
            });
        }
    }

    pub fn drag_move(&mut self, y: f64) {
        if let (Some(drag), true) = (self.drag.as_mut(), y.is_finite()) {
            drag.current_y = y;
        }
    }

    /// Ends the gesture. Returns the new position when it changed.
    pub fn drag_end(&mut self, y: f64) -> Option<SheetPosition> {
        let drag = self.drag.take()?;
        let end_y = if y.is_finite() { y } else { drag.current_y };
        let next = next_position(self.position, drag.start_y - end_y, self.config.drag_threshold_px);
        if next == self.position {
            return None;
        }
        tracing::debug!(from = ?self.position, to = ?next, "sheet snapped");
        self.position = next;
        Some(next)
    }

    /// Direct placement, used when restoring a persisted position.
    pub fn set_position(&mut self, position: SheetPosition) {
        self.drag = None;
        self.position = position;
    }

    pub fn reset_to_collapsed(&mut self) -> bool {
        self.drag = None;
        if self.position == SheetPosition::Collapsed {
            return false;
        }
        self.position = SheetPosition::Collapsed;
        true
    }

    #[must_use]
    pub fn height_for(&self, position: SheetPosition) -> f64 {
        match position {
            SheetPosition::Collapsed => self.collapsed_height(),
            SheetPosition::Half => (self.viewport_height_px * self.config.half_fraction)
                .max(self.collapsed_height()),
            SheetPosition::Full => (self.viewport_height_px * self.config.full_fraction)
                .max(self.collapsed_height()),
        }
    }

    /// Tracks the finger 1:1 while dragging, otherwise the snap height.
    #[must_use]
    pub fn current_height(&self) -> f64 {
        let base = self.height_for(self.position);
        match self.drag {
            Some(drag) => {
                let max = self.viewport_height_px.max(self.collapsed_height());
                (base + drag.start_y - drag.current_y).clamp(self.collapsed_height(), max)
            }
            None => base,
        }
    }

    #[must_use]
    pub fn layout(&self) -> SheetLayout {
        SheetLayout {
            position: self.position,
            height_px: self.current_height(),
            dragging: self.is_dragging(),
            animate: !self.is_dragging(),
        }
    }

    fn collapsed_height(&self) -> f64 {
        self.config.peek_height_px + self.chrome_height_px
    }
}

fn sanitize(px: f64) -> f64 {
    if px.is_finite() {
        px.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn controller(position: SheetPosition) -> BottomSheetController {
        let mut c = BottomSheetController::new(SheetConfig::default(), position);
        c.resize(800.0, 34.0);
        c
    }

    fn drag(c: &mut BottomSheetController, from: f64, to: f64) -> Option<SheetPosition> {
        c.drag_start(from);
        c.drag_move((from + to) / 2.0);
        c.drag_end(to)
    }

    #[test]
    fn upward_drags_step_one_state_at_a_time() {
        let mut c = controller(SheetPosition::Collapsed);
        assert_eq!(drag(&mut c, 700.0, 600.0), Some(SheetPosition::Half));
        assert_eq!(drag(&mut c, 500.0, 100.0), Some(SheetPosition::Full));
        assert_eq!(drag(&mut c, 500.0, 100.0), None);
        assert_eq!(c.position(), SheetPosition::Full);
    }

    #[test]
    fn downward_drags_step_back() {
        let mut c = controller(SheetPosition::Full);
        assert_eq!(drag(&mut c, 100.0, 200.0), Some(SheetPosition::Half));
        assert_eq!(drag(&mut c, 100.0, 200.0), Some(SheetPosition::Collapsed));
        assert_eq!(drag(&mut c, 100.0, 200.0), None);
    }

    #[test]
    fn end_without_start_is_ignored() {
        let mut c = controller(SheetPosition::Half);
        assert_eq!(c.drag_end(0.0), None);
        assert_eq!(c.position(), SheetPosition::Half);
    }

    #[test]
    fn heights_include_chrome_and_fractions() {
        let c = controller(SheetPosition::Collapsed);
        assert_eq!(c.height_for(SheetPosition::Collapsed), 96.0 + 34.0);
        assert_eq!(c.height_for(SheetPosition::Half), 400.0);
        assert_eq!(c.height_for(SheetPosition::Full), 680.0);
    }

    #[test]
    fn height_tracks_finger_without_animation_while_dragging() {
        let mut c = controller(SheetPosition::Half);
        c.drag_start(500.0);
        c.drag_move(450.0);
        let layout = c.layout();
        assert!(layout.dragging);
        assert!(!layout.animate);
        assert_eq!(layout.height_px, 450.0);
        c.drag_end(450.0);
        assert!(c.layout().animate);
        assert_eq!(c.position(), SheetPosition::Half);
    }

    #[test]
    fn resize_remeasures_chrome() {
        let mut c = controller(SheetPosition::Collapsed);
        c.resize(600.0, 0.0);
        assert_eq!(c.current_height(), 96.0);
        c.resize(f64::NAN, 20.0);
        assert_eq!(c.current_height(), 116.0);
    }

    #[test]
    fn reset_collapses() {
        let mut c = controller(SheetPosition::Full);
        assert!(c.reset_to_collapsed());
        assert!(!c.reset_to_collapsed());
        assert_eq!(c.position(), SheetPosition::Collapsed);
    }

    fn any_position() -> impl Strategy<Value = SheetPosition> {
        prop_oneof![
            Just(SheetPosition::Collapsed),
            Just(SheetPosition::Half),
            Just(SheetPosition::Full),
        ]
    }

    proptest! {
        #[test]
        fn small_displacements_never_transition(
            position in any_position(),
            displacement in -50.0f64..=50.0,
        ) {
            prop_assert_eq!(next_position(position, displacement, 50.0), position);
        }

        #[test]
        fn large_displacements_move_at_most_one_step(
            position in any_position(),
            displacement in prop_oneof![-2000.0f64..-50.001, 50.001f64..2000.0],
        ) {
            let next = next_position(position, displacement, 50.0);
            if displacement > 0.0 {
                prop_assert_eq!(next, position.up());
            } else {
                prop_assert_eq!(next, position.down());
            }
        }
    }
}
