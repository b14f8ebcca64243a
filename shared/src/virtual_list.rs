//! Append-only render window over the result list.
//!
//! Rows `[0, render_end)` are materialized; everything after is a single
//! spacer. The cursor never moves back while the same list is shown, so the
//! rendered prefix stays stable as the sheet height changes underneath it.

use serde::{Deserialize, Serialize};

use crate::config::WindowConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowState {
    pub render_end: usize,
    pub spacer_height_px: f64,
    /// Set while a scroll or resize is waiting for the next animation frame.
    pub needs_frame: bool,
}

#[derive(Debug, Clone)]
pub struct RenderWindow {
    config: WindowConfig,
    item_count: usize,
    render_end: usize,
    generation: u64,
    scroll_top_px: f64,
    container_height_px: f64,
    frame_pending: bool,
}

impl RenderWindow {
    #[must_use]
    pub const fn new(config: WindowConfig) -> Self {
        Self {
            config,
            item_count: 0,
            render_end: 0,
            generation: 0,
            scroll_top_px: 0.0,
            container_height_px: 0.0,
            frame_pending: false,
        }
    }

    /// Switches to a new list identity and shrinks back to the initial
    /// prefix. Re-measures on the next frame.
    pub fn reset(&mut self, item_count: usize, generation: u64) {
        self.item_count = item_count;
        self.generation = generation;
        self.render_end = self.config.initial_render_count.min(item_count);
        self.scroll_top_px = 0.0;
        self.frame_pending = true;
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn render_end(&self) -> usize {
        self.render_end
    }

    /// Returns true when this call scheduled a frame.
    pub fn observe_scroll(&mut self, scroll_top_px: f64) -> bool {
        if scroll_top_px.is_finite() {
            self.scroll_top_px = scroll_top_px.max(0.0);
        }
        self.schedule()
    }

    pub fn observe_resize(&mut self, container_height_px: f64) -> bool {
        if container_height_px.is_finite() {
            self.container_height_px = container_height_px.max(0.0);
        }
        self.schedule()
    }

    fn schedule(&mut self) -> bool {
        !std::mem::replace(&mut self.frame_pending, true)
    }

    /// Runs at most one window computation per frame. Returns true when
    /// `render_end` grew.
    pub fn on_frame(&mut self) -> bool {
        if !std::mem::take(&mut self.frame_pending) {
            return false;
        }
        let candidate = self.candidate_end();
        if candidate > self.render_end {
            tracing::trace!(from = self.render_end, to = candidate, "render window grew");
            self.render_end = candidate;
            true
        } else {
            false
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn candidate_end(&self) -> usize {
        let visible_bottom = self.scroll_top_px + self.container_height_px;
        let last_visible = (visible_bottom / self.config.estimated_item_height_px).ceil();
        let last_visible = if last_visible.is_finite() && last_visible > 0.0 {
            last_visible.min(self.item_count as f64) as usize
        } else {
            0
        };
        self.item_count
            .min(last_visible.saturating_add(self.config.buffer_count))
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn spacer_height_px(&self) -> f64 {
        (self.item_count - self.render_end) as f64 * self.config.estimated_item_height_px
    }

    #[must_use]
    pub fn state(&self) -> WindowState {
        WindowState {
            render_end: self.render_end,
            spacer_height_px: self.spacer_height_px(),
            needs_frame: self.frame_pending,
        }
    }
}
