//! Font loading and anchored text drawing with rusttype.
//!
//! Fonts come from prioritized path lists in the configuration. They are
//! loaded once at startup; the first candidate that reads and parses wins.

use image::{Rgba, RgbaImage};
use rusttype::{Font, Scale, point};
use std::path::PathBuf;

/// Text and icon fonts shared by every render.
#[derive(Clone, Default)]
pub struct FontSet {
    text: Option<Font<'static>>,
    icons: Option<Font<'static>>,
}

impl FontSet {
    pub fn load(text_candidates: &[PathBuf], icon_candidates: &[PathBuf]) -> Self {
        Self {
            text: load_first(text_candidates, "text"),
            icons: load_first(icon_candidates, "icon"),
        }
    }

    pub fn text(&self) -> Option<&Font<'static>> {
        self.text.as_ref()
    }

    pub fn icons(&self) -> Option<&Font<'static>> {
        self.icons.as_ref()
    }
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSet")
            .field("text", &self.text.is_some())
            .field("icons", &self.icons.is_some())
            .finish()
    }
}

/// Load the first font in `candidates` that can be read and parsed.
pub fn load_first(candidates: &[PathBuf], role: &str) -> Option<Font<'static>> {
    for path in candidates {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(role, path = %path.display(), error = %e, "font candidate unreadable");
                continue;
            }
        };
        match Font::try_from_vec(bytes) {
            Some(font) => {
                tracing::info!(role, path = %path.display(), "loaded font");
                return Some(font);
            }
            None => tracing::warn!(role, path = %path.display(), "font candidate failed to parse"),
        }
    }
    tracing::warn!(role, "no font could be loaded");
    None
}

/// Horizontal anchor of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// `x` is the left edge of the run.
    Left,
    /// `x` is the right edge of the run.
    Right,
}

/// Advance width of `text` at `size` pixels.
pub fn text_width(font: &Font<'_>, size: f32, text: &str) -> f32 {
    let scale = Scale::uniform(size);
    font.layout(text, scale, point(0.0, 0.0))
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

/// Draw `text` with its line box vertically centered on `center_y`.
///
/// Pixels outside the canvas are dropped; glyph coverage is alpha-blended
/// onto the canvas with `color`.
#[allow(clippy::too_many_arguments)]
pub fn draw_text(
    canvas: &mut RgbaImage,
    font: &Font<'_>,
    size: f32,
    text: &str,
    x: i32,
    center_y: i32,
    anchor: Anchor,
    color: Rgba<u8>,
) {
    let scale = Scale::uniform(size);
    let v_metrics = font.v_metrics(scale);
    let baseline = center_y as f32 + (v_metrics.ascent + v_metrics.descent) / 2.0;
    let left = match anchor {
        Anchor::Left => x as f32,
        Anchor::Right => x as f32 - text_width(font, size, text),
    };

    let (width, height) = (canvas.width() as i32, canvas.height() as i32);
    for glyph in font.layout(text, scale, point(left, baseline)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let px = bb.min.x + gx as i32;
            let py = bb.min.y + gy as i32;
            if px < 0 || py < 0 || px >= width || py >= height {
                return;
            }
            let alpha = (coverage * color[3] as f32).round() as u8;
            blend_pixel(
                canvas.get_pixel_mut(px as u32, py as u32),
                &Rgba([color[0], color[1], color[2], alpha]),
            );
        });
    }
}

/// Source-over blend of `overlay` onto an opaque `base` pixel.
pub fn blend_pixel(base: &mut Rgba<u8>, overlay: &Rgba<u8>) {
    let alpha = overlay[3] as f32 / 255.0;
    if alpha <= 0.0 {
        return;
    }
    let inv_alpha = 1.0 - alpha;
    for idx in 0..3 {
        base[idx] = (overlay[idx] as f32 * alpha + base[idx] as f32 * inv_alpha)
            .round()
            .clamp(0.0, 255.0) as u8;
    }
    base[3] = 255;
}
