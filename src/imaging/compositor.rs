//! Cover-fit compositing: the single resampling primitive of the pipeline.
//!
//! [`draw_cover`] fills a destination rectangle of a canvas with a source
//! raster, cropping the source to the rectangle's aspect ratio around its
//! center and scaling with nearest-neighbour inverse mapping. It never
//! letterboxes. Whole-frame fitting ([`cover_fit`]) and every collage slot
//! go through it.
//!
//! Destination rows are independent, so they are filled in parallel with
//! rayon. Output is byte-identical to a sequential fill.

use super::calculations::{Rect, cover_crop, sample_coord};
use crate::types::Geometry;
use image::{DynamicImage, RgbaImage};
use rayon::prelude::*;

const CHANNELS: usize = 4;

/// Draw `source` into `dest` on `canvas`, cropping and scaling to cover it.
///
/// The part of `dest` outside the canvas is ignored. Empty sources or
/// rectangles leave the canvas untouched.
pub fn draw_cover(canvas: &mut RgbaImage, dest: Rect, source: &RgbaImage) {
    let (canvas_w, canvas_h) = canvas.dimensions();
    let (src_w, src_h) = source.dimensions();

    let dest = Rect::new(
        dest.x,
        dest.y,
        dest.width.min(canvas_w.saturating_sub(dest.x)),
        dest.height.min(canvas_h.saturating_sub(dest.y)),
    );
    if dest.is_empty() || src_w == 0 || src_h == 0 {
        return;
    }

    let crop = cover_crop((src_w, src_h), (dest.width, dest.height));

    // Column lookup is shared by every row.
    let columns: Vec<u32> = (0..dest.width)
        .map(|x| sample_coord(x, dest.width, crop.x, crop.width, src_w))
        .collect();

    let stride = canvas_w as usize * CHANNELS;
    let x_start = dest.x as usize * CHANNELS;
    let x_end = x_start + dest.width as usize * CHANNELS;
    let buffer: &mut [u8] = canvas;

    buffer
        .par_chunks_exact_mut(stride)
        .skip(dest.y as usize)
        .take(dest.height as usize)
        .enumerate()
        .for_each(|(dy, row)| {
            let sy = sample_coord(dy as u32, dest.height, crop.y, crop.height, src_h);
            let span = &mut row[x_start..x_end];
            for (pixel, &sx) in span.chunks_exact_mut(CHANNELS).zip(&columns) {
                pixel.copy_from_slice(&source.get_pixel(sx, sy).0);
            }
        });
}

/// Produce a canvas of exactly `target` size covered by `source`.
pub fn cover_fit(source: &DynamicImage, target: Geometry) -> RgbaImage {
    let mut canvas = RgbaImage::new(target.width, target.height);
    let rgba = source.to_rgba8();
    draw_cover(&mut canvas, Rect::new(0, 0, target.width, target.height), &rgba);
    canvas
}
