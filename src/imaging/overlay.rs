//! Date and weather overlay drawn over the bottom of the composed canvas.
//!
//! Layout, in canvas pixels:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                                          │
//! │                                          │
//! │ ░░░░░░░░░░ gradient: bottom 30% ░░░░░ ☁  │  ← icon 72px, 35px above text line
//! │ Mon, Jan 05              18.3°C  47%     │  ← text line, 50px above bottom
//! └──────────────────────────────────────────┘
//!   ↑ 20px margin                    20px ↑
//! ```
//!
//! Every element degrades on its own: without a text font nothing is drawn,
//! without an icon font the glyph is skipped, and a failed weather fetch drops
//! the weather block while the date still renders.

use super::calculations::gradient_alpha;
use super::text::{Anchor, FontSet, blend_pixel, draw_text};
use crate::upstream::WeatherProvider;
use chrono::NaiveDate;
use image::{Rgba, RgbaImage};
use std::sync::Arc;

const GRADIENT_FRACTION: f32 = 0.3;
const GRADIENT_STOPS: [(f32, f32); 4] = [(0.0, 0.0), (0.3, 100.0), (0.6, 130.0), (1.0, 160.0)];

const MARGIN_X: i32 = 20;
const TEXT_LINE_FROM_BOTTOM: i32 = 50;
const ICON_ABOVE_TEXT: i32 = 35;

const DATE_SIZE: f32 = 25.0;
const WEATHER_TEXT_SIZE: f32 = 18.0;
const ICON_SIZE: f32 = 72.0;

const DATE_FORMAT: &str = "%a, %b %d";
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// What to draw on one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayOptions {
    pub show_date: bool,
    /// Weather coordinates; `None` disables the weather block.
    pub weather: Option<(f64, f64)>,
    /// Date to print, normally today's local date.
    pub date: NaiveDate,
}

impl OverlayOptions {
    pub fn is_empty(&self) -> bool {
        !self.show_date && self.weather.is_none()
    }
}

pub struct OverlayRenderer {
    fonts: FontSet,
    weather: Arc<dyn WeatherProvider>,
}

impl OverlayRenderer {
    pub fn new(fonts: FontSet, weather: Arc<dyn WeatherProvider>) -> Self {
        Self { fonts, weather }
    }

    /// Draw the overlay onto `canvas` in place and hand it back.
    pub fn apply(&self, mut canvas: RgbaImage, options: &OverlayOptions) -> RgbaImage {
        if options.is_empty() {
            return canvas;
        }
        let Some(text_font) = self.fonts.text() else {
            tracing::warn!("no text font loaded, skipping overlay");
            return canvas;
        };

        draw_gradient(&mut canvas);

        let (width, height) = (canvas.width() as i32, canvas.height() as i32);
        let text_line = height - TEXT_LINE_FROM_BOTTOM;

        if options.show_date {
            let label = options.date.format(DATE_FORMAT).to_string();
            draw_text(
                &mut canvas,
                text_font,
                DATE_SIZE,
                &label,
                MARGIN_X,
                text_line,
                Anchor::Left,
                WHITE,
            );
        }

        if let Some((lat, lon)) = options.weather {
            match self.weather.current(lat, lon) {
                Ok(weather) => {
                    let right = width - MARGIN_X;
                    if let Some(icon_font) = self.fonts.icons() {
                        let glyph = weather.condition().glyph().to_string();
                        draw_text(
                            &mut canvas,
                            icon_font,
                            ICON_SIZE,
                            &glyph,
                            right,
                            text_line - ICON_ABOVE_TEXT,
                            Anchor::Right,
                            WHITE,
                        );
                    }
                    draw_text(
                        &mut canvas,
                        text_font,
                        WEATHER_TEXT_SIZE,
                        &weather.summary(),
                        right,
                        text_line,
                        Anchor::Right,
                        WHITE,
                    );
                }
                Err(e) => tracing::warn!(lat, lon, error = %e, "weather fetch failed, omitting block"),
            }
        }

        canvas
    }
}

/// Darken the bottom band with a vertical black gradient.
fn draw_gradient(canvas: &mut RgbaImage) {
    let height = canvas.height();
    let band = (height as f32 * GRADIENT_FRACTION).round() as u32;
    if band == 0 {
        return;
    }
    let top = height - band;
    for (y, row) in canvas.enumerate_rows_mut() {
        if y < top {
            continue;
        }
        let t = (y - top) as f32 / band as f32;
        let alpha = gradient_alpha(&GRADIENT_STOPS, t).round() as u8;
        let shade = Rgba([0, 0, 0, alpha]);
        for (_, _, pixel) in row {
            blend_pixel(pixel, &shade);
        }
    }
}
