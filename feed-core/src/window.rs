//! Visible index range for a fixed-row-height virtual list.
//!
//! Row height is a constant estimate rather than a per-row measurement, so
//! the window is computed in O(1) from the scroll offset alone:
//!
//! ```text
//! start = max(0, floor(scroll / h) - overscan)
//! end   = min(total, ceil((scroll + viewport) / h) + overscan)
//! ```

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Half-open index range `[start, end)` of rows to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowRange {
    pub start: usize,
    pub end: usize,
}

impl WindowRange {
    pub const EMPTY: WindowRange = WindowRange { start: 0, end: 0 };

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Scroll position and viewport size as reported by the rendering surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scroll_offset: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(scroll_offset: f64, height: f64) -> Self {
        Self {
            scroll_offset,
            height,
        }
    }
}

/// Windowing math for one list configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowCalculator {
    item_height: f64,
    overscan: usize,
}

impl WindowCalculator {
    pub fn new(item_height: f64, overscan: usize) -> Result<Self> {
        if !item_height.is_finite() || item_height <= 0.0 {
            return Err(CoreError::InvalidItemHeight(item_height));
        }
        Ok(Self {
            item_height,
            overscan,
        })
    }

    pub fn item_height(&self) -> f64 {
        self.item_height
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Rows to render for `viewport` over a collection of `total_items`.
    ///
    /// Always satisfies `0 <= start <= end <= total_items`.
    pub fn range(&self, viewport: Viewport, total_items: usize) -> WindowRange {
        if total_items == 0 {
            return WindowRange::EMPTY;
        }

        let scroll = sanitize(viewport.scroll_offset);
        let height = sanitize(viewport.height);

        let first_visible = to_index(scroll / self.item_height, f64::floor);
        // The two divisions round independently, so cap the span at what
        // `max_rows` allows for this height.
        let last_visible = to_index((scroll + height) / self.item_height, f64::ceil)
            .min(first_visible.saturating_add(self.visible_rows(height)).saturating_add(1));

        let end = last_visible.saturating_add(self.overscan).min(total_items);
        let start = first_visible.saturating_sub(self.overscan).min(end);

        WindowRange { start, end }
    }

    /// Pixel offset of the row at `index` inside the spacer.
    pub fn offset_of(&self, index: usize) -> f64 {
        index as f64 * self.item_height
    }

    /// Spacer height that makes the native scrollbar reflect the full collection.
    pub fn spacer_height(&self, total_items: usize) -> f64 {
        total_items as f64 * self.item_height
    }

    /// Upper bound on live rows regardless of collection size.
    pub fn max_rows(&self, viewport_height: f64) -> usize {
        self.visible_rows(sanitize(viewport_height))
            .saturating_add(self.overscan.saturating_mul(2))
            .saturating_add(1)
    }

    fn visible_rows(&self, height: f64) -> usize {
        to_index(height / self.item_height, f64::ceil)
    }
}

/// Negative, NaN and infinite pixel values collapse to zero.
fn sanitize(px: f64) -> f64 {
    if px.is_finite() && px > 0.0 {
        px
    } else {
        0.0
    }
}

fn to_index(rows: f64, round: fn(f64) -> f64) -> usize {
    let rounded = round(rows);
    if rounded >= usize::MAX as f64 {
        usize::MAX
    } else {
        rounded as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc(h: f64, overscan: usize) -> WindowCalculator {
        WindowCalculator::new(h, overscan).unwrap()
    }

    #[test]
    fn test_initial_window_two_rows_visible() {
        let range = calc(450.0, 5).range(Viewport::new(0.0, 900.0), 1000);
        assert_eq!(range, WindowRange { start: 0, end: 7 });
    }

    #[test]
    fn test_scrolled_window() {
        // rows 10..12 visible, +/- 2 overscan
        let range = calc(100.0, 2).range(Viewport::new(1000.0, 200.0), 1000);
        assert_eq!(range, WindowRange { start: 8, end: 14 });
    }

    #[test]
    fn test_partial_row_rounds_outward() {
        let range = calc(100.0, 0).range(Viewport::new(150.0, 200.0), 1000);
        assert_eq!(range, WindowRange { start: 1, end: 4 });
    }

    #[test]
    fn test_clamped_at_end() {
        let range = calc(100.0, 5).range(Viewport::new(950.0, 300.0), 12);
        assert_eq!(range, WindowRange { start: 4, end: 12 });
    }

    #[test]
    fn test_scroll_past_end_is_empty_at_tail() {
        let range = calc(100.0, 1).range(Viewport::new(50_000.0, 300.0), 20);
        assert_eq!(range, WindowRange { start: 20, end: 20 });
        assert!(range.is_empty());
    }

    #[test]
    fn test_empty_collection() {
        let range = calc(450.0, 5).range(Viewport::new(300.0, 900.0), 0);
        assert_eq!(range, WindowRange::EMPTY);
    }

    #[test]
    fn test_bad_viewport_values_treated_as_zero() {
        let c = calc(100.0, 0);
        assert_eq!(c.range(Viewport::new(-500.0, 200.0), 50), WindowRange { start: 0, end: 2 });
        assert_eq!(c.range(Viewport::new(f64::NAN, 200.0), 50), WindowRange { start: 0, end: 2 });
        assert_eq!(c.range(Viewport::new(0.0, -1.0), 50), WindowRange { start: 0, end: 0 });
    }

    #[test]
    fn test_rounding_never_exceeds_max_rows() {
        // 26.4 / 1.1 rounds just below 24 while 69.3 / 1.1 rounds just above 63
        let c = calc(1.1, 0);
        let height = 42.900000000000006;
        let range = c.range(Viewport::new(26.4, height), 1000);

        assert_eq!(range.start, 23);
        assert!(range.len() <= c.max_rows(height), "{:?} exceeds {}", range, c.max_rows(height));

        let with_overscan = calc(1.1, 3).range(Viewport::new(26.4, height), 1000);
        assert!(with_overscan.len() <= calc(1.1, 3).max_rows(height));
    }

    #[test]
    fn test_rejects_bad_item_height() {
        assert!(WindowCalculator::new(0.0, 1).is_err());
        assert!(WindowCalculator::new(-3.0, 1).is_err());
        assert!(WindowCalculator::new(f64::INFINITY, 1).is_err());
        assert!(WindowCalculator::new(f64::NAN, 1).is_err());
    }

    #[test]
    fn test_geometry() {
        let c = calc(450.0, 5);
        assert_eq!(c.offset_of(3), 1350.0);
        assert_eq!(c.spacer_height(1000), 450_000.0);
        assert_eq!(c.max_rows(900.0), 13);
    }
}
