//! Ratio-space geometry
//!
//! All region coordinates are stored normalized (0.0-1.0) relative to the
//! displayed image, so they survive zoom and DPI changes.

use serde::{Deserialize, Serialize};

/// A point in ratio space (0.0-1.0 on both axes)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatioPoint {
    pub x: f64,
    pub y: f64,
}

impl RatioPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A pointer position in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box of the displayed image, in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Box of the given size placed at the origin
    pub fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Whether the box has a usable (positive) area
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

impl Default for PixelBox {
    fn default() -> Self {
        Self::sized(1.0, 1.0)
    }
}

/// Normalized rectangle (x, y, w, h) relative to the image bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Zero-area rect at a point, the shape of a draw gesture before any drag
    pub fn at(point: RatioPoint) -> Self {
        Self::new(point.x, point.y, 0.0, 0.0)
    }

    /// Rect spanned by two corners, in either drag direction
    pub fn from_corners(a: RatioPoint, b: RatioPoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            w: (b.x - a.x).abs(),
            h: (b.y - a.y).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Axis-aligned containment, edges inclusive
    pub fn contains(&self, point: RatioPoint) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Whether the rect lies fully inside the unit square
    pub fn is_within_unit(&self) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.w >= 0.0 && self.h >= 0.0 && self.right() <= 1.0 && self.bottom() <= 1.0
    }

    /// Convert to screen pixels for rendering: (left, top, width, height)
    pub fn to_pixels(&self, bounds: &PixelBox) -> (f64, f64, f64, f64) {
        (
            bounds.left + self.x * bounds.width,
            bounds.top + self.y * bounds.height,
            self.w * bounds.width,
            self.h * bounds.height,
        )
    }

    /// Footprint of the rect in pixels: (width, height)
    pub fn pixel_size(&self, bounds: &PixelBox) -> (f64, f64) {
        (self.w * bounds.width, self.h * bounds.height)
    }
}

/// Convert a pointer position to ratio space.
///
/// The pointer is clamped to the image bounds first, so dragging past the
/// edge of the image never yields ratios outside 0.0-1.0.
pub fn to_ratio(pointer: PixelPoint, bounds: &PixelBox) -> RatioPoint {
    if bounds.is_degenerate() {
        return RatioPoint::default();
    }
    let x = (pointer.x - bounds.left).clamp(0.0, bounds.width);
    let y = (pointer.y - bounds.top).clamp(0.0, bounds.height);
    RatioPoint::new(x / bounds.width, y / bounds.height)
}

/// Hit test a point against a region rect.
///
/// Ellipses are tested against their bounding box as well; the hit geometry
/// of every shape is its rect.
pub fn point_in_region(point: RatioPoint, rect: &NormalizedRect) -> bool {
    rect.contains(point)
}

/// Translate a rect by (dx, dy), keeping it fully inside the unit square.
/// Width and height are unchanged.
pub fn clamp_region_origin(rect: &NormalizedRect, dx: f64, dy: f64) -> NormalizedRect {
    NormalizedRect {
        x: clamp_upper_first(rect.x + dx, 1.0 - rect.w),
        y: clamp_upper_first(rect.y + dy, 1.0 - rect.h),
        w: rect.w,
        h: rect.h,
    }
}

// max(0, min(hi, v)); stays total when hi < 0
fn clamp_upper_first(value: f64, hi: f64) -> f64 {
    value.min(hi).max(0.0)
}

/// Force a square pixel footprint.
///
/// Both ratios are converted to pixels, the larger pixel edge becomes the
/// common edge, and the result is converted back to ratio space.
pub fn apply_aspect_lock(w: f64, h: f64, bounds: &PixelBox) -> (f64, f64) {
    if bounds.is_degenerate() {
        return (w, h);
    }
    let edge = (w * bounds.width).max(h * bounds.height);
    (edge / bounds.width, edge / bounds.height)
}

/// Shrink a square footprint so it fits the given ratio extents on both axes.
///
/// `max_w` / `max_h` are the room available in ratio space; the result stays
/// square in pixels.
pub fn fit_square_within(w: f64, h: f64, max_w: f64, max_h: f64, bounds: &PixelBox) -> (f64, f64) {
    if bounds.is_degenerate() {
        return (w.min(max_w), h.min(max_h));
    }
    let edge = (w * bounds.width)
        .min(max_w * bounds.width)
        .min(max_h * bounds.height)
        .max(0.0);
    // the pixel round trip can overshoot the limits by an ulp
    ((edge / bounds.width).min(max_w), (edge / bounds.height).min(max_h))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_to_ratio_inside() {
        let bounds = PixelBox::new(100.0, 50.0, 1000.0, 500.0);
        let p = to_ratio(PixelPoint::new(600.0, 300.0), &bounds);
        assert!((p.x - 0.5).abs() < EPS);
        assert!((p.y - 0.5).abs() < EPS);
    }

    #[test]
    fn test_to_ratio_clamps_outside_pointer() {
        let bounds = PixelBox::new(100.0, 50.0, 1000.0, 500.0);

        let p = to_ratio(PixelPoint::new(-400.0, 9000.0), &bounds);
        assert_eq!(p, RatioPoint::new(0.0, 1.0));

        let p = to_ratio(PixelPoint::new(5000.0, 0.0), &bounds);
        assert_eq!(p, RatioPoint::new(1.0, 0.0));
    }

    #[test]
    fn test_to_ratio_degenerate_box() {
        let bounds = PixelBox::sized(0.0, 200.0);
        assert_eq!(to_ratio(PixelPoint::new(10.0, 10.0), &bounds), RatioPoint::default());
    }

    #[test]
    fn test_point_in_region_edges_inclusive() {
        let rect = NormalizedRect::new(0.2, 0.2, 0.3, 0.1);
        assert!(point_in_region(RatioPoint::new(0.2, 0.2), &rect));
        assert!(point_in_region(RatioPoint::new(0.5, 0.3), &rect));
        assert!(!point_in_region(RatioPoint::new(0.51, 0.25), &rect));
        assert!(!point_in_region(RatioPoint::new(0.3, 0.19), &rect));
    }

    #[test]
    fn test_point_in_region_uses_bounding_box_corners() {
        // A corner is outside the inscribed ellipse but still a hit
        let rect = NormalizedRect::new(0.0, 0.0, 0.4, 0.4);
        assert!(point_in_region(RatioPoint::new(0.01, 0.01), &rect));
    }

    #[test]
    fn test_clamp_region_origin_pushes_back_inside() {
        let rect = NormalizedRect::new(0.9, 0.9, 0.2, 0.2);
        let moved = clamp_region_origin(&rect, 0.5, 0.5);
        assert!((moved.x - 0.8).abs() < EPS);
        assert!((moved.y - 0.8).abs() < EPS);
        assert_eq!(moved.w, 0.2);
        assert_eq!(moved.h, 0.2);
    }

    #[test]
    fn test_clamp_region_origin_negative() {
        let rect = NormalizedRect::new(0.1, 0.3, 0.2, 0.2);
        let moved = clamp_region_origin(&rect, -0.5, -0.1);
        assert_eq!(moved.x, 0.0);
        assert!((moved.y - 0.2).abs() < EPS);
    }

    #[test]
    fn test_aspect_lock_takes_larger_pixel_edge() {
        let bounds = PixelBox::sized(1000.0, 500.0);
        let (w, h) = apply_aspect_lock(0.3, 0.1, &bounds);
        // 300px vs 50px -> 300px square
        assert!((w - 0.3).abs() < EPS);
        assert!((h - 0.6).abs() < EPS);

        let (w, h) = apply_aspect_lock(0.1, 0.4, &bounds);
        // 100px vs 200px -> 200px square
        assert!((w - 0.2).abs() < EPS);
        assert!((h - 0.4).abs() < EPS);
    }

    #[test]
    fn test_fit_square_within_keeps_square() {
        let bounds = PixelBox::sized(1000.0, 500.0);
        let (w, h) = fit_square_within(0.3, 0.6, 1.0, 0.4, &bounds);
        assert!((w * 1000.0 - h * 500.0).abs() < 1e-6);
        assert!(h <= 0.4 + EPS);
    }

    #[test]
    fn test_fit_square_within_never_exceeds_limits() {
        let bounds = PixelBox::sized(1315.1223635391787, 1985.3464122002547);
        let max_w = 1.0 - 0.05767224104037486;
        let max_h = 1.0 - 0.06632057640620977;
        let (w, h) = fit_square_within(5.0, 5.0, max_w, max_h, &bounds);
        assert!(w <= max_w);
        assert!(h <= max_h);
        assert!((w * bounds.width - h * bounds.height).abs() < 1e-6);
    }

    #[test]
    fn test_from_corners_reversed() {
        let r = NormalizedRect::from_corners(RatioPoint::new(0.5, 0.4), RatioPoint::new(0.1, 0.2));
        assert!((r.x - 0.1).abs() < EPS);
        assert!((r.y - 0.2).abs() < EPS);
        assert!((r.w - 0.4).abs() < EPS);
        assert!((r.h - 0.2).abs() < EPS);
    }

    #[test]
    fn test_to_pixels() {
        let bounds = PixelBox::new(10.0, 20.0, 1000.0, 1000.0);
        let (left, top, w, h) = NormalizedRect::new(0.1, 0.2, 0.2, 0.2).to_pixels(&bounds);
        assert!((left - 110.0).abs() < 1e-6);
        assert!((top - 220.0).abs() < 1e-6);
        assert!((w - 200.0).abs() < 1e-6);
        assert!((h - 200.0).abs() < 1e-6);
    }
}
