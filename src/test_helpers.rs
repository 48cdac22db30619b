//! Shared test utilities for the photoframe-server test suite.
//!
//! Builders for stored records, synthetic images, and recording fakes for
//! every collaborator trait. Fakes count their calls behind a `Mutex` so
//! tests can assert what the code under test asked for.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let store = MemoryStore::with_assets(vec![asset(1, SourceKind::Google, 800, 600)]);
//! let loader = TestLoader::new().with_solid(1, 800, 600, Rgba([255, 0, 0, 255]));
//! let placeholder = FakePlaceholder::ok();
//! let selector = Selector::new(&store, &loader, &placeholder);
//! ```

use chrono::{TimeZone, Utc};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::FontsConfig;
use crate::error::FrameError;
use crate::processing::{Processed, ProcessingDelegate, ProcessingOptions};
use crate::types::{AssetId, AssetLocation, DeviceProfile, Orientation, PhotoAsset, SourceKind};
use crate::upstream::{AssetLoader, PlaceholderProvider, Weather, WeatherProvider};

// =========================================================================
// Records
// =========================================================================

/// A local asset whose tag matches its stored dimensions.
pub fn asset(id: AssetId, source: SourceKind, width: u32, height: u32) -> PhotoAsset {
    PhotoAsset {
        id,
        source,
        location: AssetLocation::Local(PathBuf::from(format!("/photos/{id}.jpg"))),
        width,
        height,
        orientation: Orientation::of(width, height),
        sequence: 0,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
    }
}

/// A telegram asset carrying an arrival sequence.
pub fn sequenced(id: AssetId, sequence: i64) -> PhotoAsset {
    PhotoAsset {
        sequence,
        ..asset(id, SourceKind::Telegram, 800, 600)
    }
}

/// A local asset at an explicit path.
pub fn asset_at(id: AssetId, source: SourceKind, path: &str) -> PhotoAsset {
    PhotoAsset {
        location: AssetLocation::Local(PathBuf::from(path)),
        ..asset(id, source, 4, 4)
    }
}

/// An 800x480 profile with every toggle off.
pub fn profile(id: i64, host: &str) -> DeviceProfile {
    DeviceProfile {
        id,
        host: host.to_string(),
        name: format!("frame {host}"),
        width: 800,
        height: 480,
        orientation: None,
        enable_collage: false,
        show_date: false,
        show_weather: false,
        weather_lat: None,
        weather_lon: None,
    }
}

// =========================================================================
// Images
// =========================================================================

pub fn solid(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}

/// Red, green, blue and white quadrants (clockwise from top-left).
pub fn quadrants(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        match (x < width / 2, y < height / 2) {
            (true, true) => Rgba([255, 0, 0, 255]),
            (false, true) => Rgba([0, 255, 0, 255]),
            (false, false) => Rgba([0, 0, 255, 255]),
            (true, false) => Rgba([255, 255, 255, 255]),
        }
    })
}

/// Write a mid-grey PNG, creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    solid(width, height, Rgba([128, 128, 128, 255])).save(path).unwrap();
}

pub fn encode_png(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    bytes
}

/// Text font candidates present on this machine.
pub fn system_font_paths() -> Vec<PathBuf> {
    FontsConfig::default()
        .text
        .into_iter()
        .filter(|p| p.is_file())
        .collect()
}

/// Font candidates for a font-dependent test, or `None` with a note on
/// stderr so a skipped run shows up in `--nocapture` output.
pub fn fonts_or_skip(test: &str) -> Option<Vec<PathBuf>> {
    let paths = system_font_paths();
    if paths.is_empty() {
        eprintln!("skipping {test}: no system text font found");
        return None;
    }
    Some(paths)
}

// =========================================================================
// Collaborator fakes
// =========================================================================

/// Decodes only the ids it was given; every other id fails.
#[derive(Default)]
pub struct TestLoader {
    images: HashMap<AssetId, DynamicImage>,
    loads: Mutex<Vec<AssetId>>,
}

impl TestLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solid(mut self, id: AssetId, width: u32, height: u32, color: Rgba<u8>) -> Self {
        self.images
            .insert(id, DynamicImage::ImageRgba8(solid(width, height, color)));
        self
    }

    /// Every id asked for, in order, including failed loads.
    pub fn loads(&self) -> Vec<AssetId> {
        self.loads.lock().unwrap().clone()
    }
}

impl AssetLoader for TestLoader {
    fn load(&self, asset: &PhotoAsset) -> Result<DynamicImage, FrameError> {
        self.loads.lock().unwrap().push(asset.id);
        self.images
            .get(&asset.id)
            .cloned()
            .ok_or_else(|| FrameError::NotFound(format!("asset {}", asset.id)))
    }
}

pub struct FakePlaceholder {
    fail: bool,
    calls: Mutex<usize>,
}

impl FakePlaceholder {
    /// Serves a 40x24 magenta image.
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl PlaceholderProvider for FakePlaceholder {
    fn fetch(&self) -> Result<DynamicImage, FrameError> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(FrameError::Upstream("placeholder service down".into()));
        }
        Ok(DynamicImage::ImageRgba8(solid(40, 24, Rgba([255, 0, 255, 255]))))
    }
}

pub struct FakeWeather {
    reading: Option<Weather>,
    calls: Mutex<usize>,
}

impl FakeWeather {
    /// Clear sky, 21.5°C, 40% humidity.
    pub fn sunny() -> Self {
        Self {
            reading: Some(Weather {
                temperature: 21.5,
                humidity: 40,
                code: 0,
            }),
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reading: None,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl WeatherProvider for FakeWeather {
    fn current(&self, _latitude: f64, _longitude: f64) -> Result<Weather, FrameError> {
        *self.calls.lock().unwrap() += 1;
        self.reading
            .ok_or_else(|| FrameError::Upstream("weather service down".into()))
    }
}

/// One call seen by [`RecordingDelegate`].
#[derive(Debug, Clone, PartialEq)]
pub struct DelegateCall {
    pub canvas: (u32, u32),
    pub options: ProcessingOptions,
}

/// Returns the canvas as PNG plus a fixed preview, recording each call.
#[derive(Default)]
pub struct RecordingDelegate {
    without_thumbnail: bool,
    calls: Mutex<Vec<DelegateCall>>,
}

impl RecordingDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_thumbnail() -> Self {
        Self {
            without_thumbnail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<DelegateCall> {
        self.calls.lock().unwrap().clone()
    }
}

pub const RECORDED_THUMBNAIL: &[u8] = b"preview-jpeg";

impl ProcessingDelegate for RecordingDelegate {
    fn process(&self, canvas: &RgbaImage, options: &ProcessingOptions) -> Result<Processed, FrameError> {
        self.calls.lock().unwrap().push(DelegateCall {
            canvas: canvas.dimensions(),
            options: options.clone(),
        });
        Ok(Processed {
            image: encode_png(canvas),
            thumbnail: (!self.without_thumbnail).then(|| RECORDED_THUMBNAIL.to_vec()),
        })
    }
}
