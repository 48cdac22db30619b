//! Two-photo collage layout.
//!
//! The canvas is split into two bands along the stacking axis (see
//! [`collage_slots`]) and each band is filled with [`draw_cover`].

use super::calculations::{StackAxis, collage_slots};
use super::compositor::draw_cover;
use crate::types::Geometry;
use image::{DynamicImage, RgbaImage};

/// Compose `first` and `second` onto a canvas of `size`.
///
/// `first` goes to the top (vertical) or left (horizontal) band.
pub fn compose_collage(
    first: &DynamicImage,
    second: &DynamicImage,
    size: Geometry,
    axis: StackAxis,
) -> RgbaImage {
    let mut canvas = RgbaImage::new(size.width, size.height);
    let (slot1, slot2) = collage_slots(size.width, size.height, axis);
    draw_cover(&mut canvas, slot1, &first.to_rgba8());
    draw_cover(&mut canvas, slot2, &second.to_rgba8());
    canvas
}
