//! Viewport rendering
//!
//! [`ViewportRenderer`] turns the committed list, a window range and a
//! sponsor snapshot into a [`WindowFrame`] and hands it to the
//! [`RenderSurface`]. Only rows inside the window are built, so the live row
//! count stays bounded by the viewport no matter how long the list is.
//! Every frame replaces the previous one; nothing is diffed or reused.

use feed_core::{
    layout_window, EntityMap, FieldMapping, Record, Viewport, WindowCalculator, WindowFrame,
    WindowRange,
};
use std::sync::{Arc, Mutex};

use crate::error::FeedError;

/// The scrollable region the feed draws into.
pub trait RenderSurface: Send + Sync {
    /// Current height of the scrollable region in pixels.
    fn viewport_height(&self) -> f64;

    /// A fetch cycle is in flight.
    fn show_loading(&self);

    /// Replace all rendered rows with `frame`.
    fn render_window(&self, frame: WindowFrame);

    /// The cycle failed; no rows.
    fn show_error(&self, error: &FeedError);

    /// Move the native scroll position, e.g. back to the top for a new list.
    fn scroll_to(&self, _offset: f64) {}
}

pub struct ViewportRenderer {
    calculator: WindowCalculator,
    fields: FieldMapping,
    surface: Arc<dyn RenderSurface>,
}

impl ViewportRenderer {
    pub fn new(
        calculator: WindowCalculator,
        fields: FieldMapping,
        surface: Arc<dyn RenderSurface>,
    ) -> Self {
        Self {
            calculator,
            fields,
            surface,
        }
    }

    pub fn calculator(&self) -> &WindowCalculator {
        &self.calculator
    }

    /// Draw exactly the rows of `range`. Returns the number of live rows.
    pub fn render_window(&self, records: &[Record], range: WindowRange, entities: &EntityMap) -> usize {
        let frame = layout_window(&self.calculator, &self.fields, records, range, entities);
        let rows = frame.rows.len();
        self.surface.render_window(frame);
        rows
    }

    /// Compute the window at `scroll_offset` for the surface's current
    /// height and draw it.
    pub fn render(&self, records: &[Record], scroll_offset: f64, entities: &EntityMap) -> WindowRange {
        let viewport = Viewport::new(scroll_offset, self.surface.viewport_height());
        let range = self.calculator.range(viewport, records.len());
        self.render_window(records, range, entities);
        range
    }

    pub fn show_loading(&self) {
        self.surface.show_loading();
    }

    pub fn show_error(&self, error: &FeedError) {
        self.surface.show_error(error);
    }

    pub fn scroll_to(&self, offset: f64) {
        self.surface.scroll_to(offset);
    }
}

// ============================================================================
// Recording surface (for tests and headless use)
// ============================================================================

/// Everything a surface was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Loading,
    Window(WindowFrame),
    Error(FeedError),
    ScrollTo(f64),
}

/// Surface that records every call instead of drawing.
pub struct RecordingSurface {
    viewport_height: Mutex<f64>,
    events: Mutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    pub fn new(viewport_height: f64) -> Self {
        Self {
            viewport_height: Mutex::new(viewport_height),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Simulate a resize of the scrollable region.
    pub fn set_viewport_height(&self, px: f64) {
        if let Ok(mut height) = self.viewport_height.lock() {
            *height = px;
        }
    }

    fn push(&self, event: SurfaceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn frames(&self) -> Vec<WindowFrame> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SurfaceEvent::Window(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    pub fn last_frame(&self) -> Option<WindowFrame> {
        self.frames().pop()
    }

    pub fn render_count(&self) -> usize {
        self.frames().len()
    }

    pub fn last_event(&self) -> Option<SurfaceEvent> {
        self.events().pop()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl RenderSurface for RecordingSurface {
    fn viewport_height(&self) -> f64 {
        self.viewport_height.lock().map(|h| *h).unwrap_or_default()
    }

    fn show_loading(&self) {
        self.push(SurfaceEvent::Loading);
    }

    fn render_window(&self, frame: WindowFrame) {
        self.push(SurfaceEvent::Window(frame));
    }

    fn show_error(&self, error: &FeedError) {
        self.push(SurfaceEvent::Error(error.clone()));
    }

    fn scroll_to(&self, offset: f64) {
        self.push(SurfaceEvent::ScrollTo(offset));
    }
}
