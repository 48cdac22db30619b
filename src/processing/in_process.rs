//! Built-in processing used when no external tool is configured.
//!
//! | Step | Crate / function |
//! |---|---|
//! | Rotate to panel orientation | `image::imageops::rotate90` |
//! | Resize to native size | `image::imageops::resize` with `Lanczos3` |
//! | Encode frame | PNG via `DynamicImage::write_to` |
//! | Preview | `DynamicImage::thumbnail` (longest edge 320) → JPEG |

use super::options::DIMENSION_KEY;
use super::{Processed, ProcessingDelegate, ProcessingOptions, parse_dimension};
use crate::error::FrameError;
use crate::types::Geometry;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Longest edge of the JPEG preview.
pub const THUMBNAIL_EDGE: u32 = 320;
const THUMBNAIL_QUALITY: u8 = 85;

#[derive(Debug, Default, Clone, Copy)]
pub struct InProcessDelegate;

impl InProcessDelegate {
    pub fn new() -> Self {
        Self
    }
}

/// Rotate and resize `canvas` so it exactly fills `target`.
fn fit_to_panel(canvas: &RgbaImage, target: Geometry) -> RgbaImage {
    let source = Geometry::new(canvas.width(), canvas.height());
    let rotated;
    let oriented = if source.orientation() != target.orientation() {
        rotated = imageops::rotate90(canvas);
        &rotated
    } else {
        canvas
    };
    if oriented.dimensions() == (target.width, target.height) {
        return oriented.clone();
    }
    imageops::resize(oriented, target.width, target.height, FilterType::Lanczos3)
}

fn encode_png(image: RgbaImage) -> Result<Vec<u8>, FrameError> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image).write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

fn encode_thumbnail(canvas: &RgbaImage) -> Result<Vec<u8>, FrameError> {
    let preview = DynamicImage::ImageRgba8(canvas.clone())
        .thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE)
        .to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, THUMBNAIL_QUALITY).encode_image(&preview)?;
    Ok(buf)
}

impl ProcessingDelegate for InProcessDelegate {
    fn process(&self, canvas: &RgbaImage, options: &ProcessingOptions) -> Result<Processed, FrameError> {
        let target = options
            .get(DIMENSION_KEY)
            .and_then(|v| parse_dimension(v))
            .unwrap_or(Geometry::new(canvas.width(), canvas.height()));

        let frame = fit_to_panel(canvas, target);
        Ok(Processed {
            image: encode_png(frame)?,
            thumbnail: Some(encode_thumbnail(canvas)?),
        })
    }
}
