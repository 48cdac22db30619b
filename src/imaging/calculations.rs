//! Pure calculation functions for cover-fit and collage geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::types::Orientation;

/// A rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Calculate the centered crop window of `source` whose aspect ratio equals
/// the destination's.
///
/// If the source is wider than the destination, the width is cropped (full
/// height kept, centered horizontally); otherwise the height is cropped
/// (full width kept, centered vertically).
///
/// # Arguments
/// * `source` - Source dimensions (width, height), both non-zero
/// * `dest` - Destination dimensions (width, height), both non-zero
///
/// # Examples
/// ```
/// # use photoframe_server::imaging::{cover_crop, Rect};
/// // 4:3 source into a square: keep full height, crop the sides
/// assert_eq!(cover_crop((400, 300), (100, 100)), Rect::new(50, 0, 300, 300));
/// ```
pub fn cover_crop(source: (u32, u32), dest: (u32, u32)) -> Rect {
    let (src_w, src_h) = source;
    let (dst_w, dst_h) = dest;

    let src_aspect = src_w as f64 / src_h as f64;
    let dst_aspect = dst_w as f64 / dst_h as f64;

    if src_aspect > dst_aspect {
        // Source is wider: crop width
        let w = (src_h as f64 * dst_w as f64 / dst_h as f64) as u32;
        let w = w.clamp(1, src_w);
        Rect::new((src_w - w) / 2, 0, w, src_h)
    } else {
        // Source is taller (or equal): crop height
        let h = (src_w as f64 * dst_h as f64 / dst_w as f64) as u32;
        let h = h.clamp(1, src_h);
        Rect::new(0, (src_h - h) / 2, src_w, h)
    }
}

/// Map a destination index onto a source coordinate along one axis.
///
/// `index / dest_len` is the normalized position inside the destination; it
/// is scaled onto the crop window and floored (nearest neighbour), then
/// clamped into `[0, source_len - 1]`.
pub fn sample_coord(index: u32, dest_len: u32, crop_start: u32, crop_len: u32, source_len: u32) -> u32 {
    let offset = (index as u64 * crop_len as u64 / dest_len.max(1) as u64) as u32;
    crop_start
        .saturating_add(offset)
        .min(source_len.saturating_sub(1))
}

/// Split a length into two adjacent bands.
///
/// The first band gets `len / 2`; any remainder pixel goes to the second.
///
/// # Returns
/// * `(first, second)` with `first + second == len`
pub fn split_bands(len: u32) -> (u32, u32) {
    let first = len / 2;
    (first, len - first)
}

/// Axis along which a two-photo collage is stacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackAxis {
    /// Photo 1 on top, photo 2 below.
    Vertical,
    /// Photo 1 left, photo 2 right.
    Horizontal,
}

impl StackAxis {
    /// Stack vertically on a portrait canvas, side by side on a landscape one.
    pub fn for_canvas(canvas: Orientation) -> Self {
        match canvas {
            Orientation::Portrait => StackAxis::Vertical,
            Orientation::Landscape => StackAxis::Horizontal,
        }
    }
}

/// Calculate the two slot rectangles of a collage canvas.
pub fn collage_slots(width: u32, height: u32, axis: StackAxis) -> (Rect, Rect) {
    match axis {
        StackAxis::Vertical => {
            let (top, bottom) = split_bands(height);
            (Rect::new(0, 0, width, top), Rect::new(0, top, width, bottom))
        }
        StackAxis::Horizontal => {
            let (left, right) = split_bands(width);
            (Rect::new(0, 0, left, height), Rect::new(left, 0, right, height))
        }
    }
}

/// Linear interpolation of gradient alpha stops at position `t` in `[0, 1]`.
///
/// Stops must be sorted by position. Positions outside the stop range take
/// the nearest stop's value.
pub fn gradient_alpha(stops: &[(f32, f32)], t: f32) -> f32 {
    let Some(&(first_pos, first_alpha)) = stops.first() else {
        return 0.0;
    };
    if t <= first_pos {
        return first_alpha;
    }
    for pair in stops.windows(2) {
        let (p0, a0) = pair[0];
        let (p1, a1) = pair[1];
        if t <= p1 {
            let span = (p1 - p0).max(f32::EPSILON);
            return a0 + (a1 - a0) * (t - p0) / span;
        }
    }
    stops.last().map(|&(_, a)| a).unwrap_or(first_alpha)
}
