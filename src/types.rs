//! Shared records read by every stage of the composition pipeline.
//!
//! The asset pool and the device profiles are owned by external ingestion
//! and settings subsystems; this crate only reads them (plus best-effort
//! geometry write-backs, see [`crate::device`]).

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Provenance of a photograph in the asset pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Google,
    Synology,
    Telegram,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Google, SourceKind::Synology, SourceKind::Telegram];

    /// Value stored in the `source` column of the asset table.
    pub fn as_db_str(self) -> &'static str {
        match self {
            SourceKind::Google => "google",
            SourceKind::Synology => "synology",
            SourceKind::Telegram => "telegram",
        }
    }

    /// Name used in request paths (`/image/{source}`).
    pub fn route_name(self) -> &'static str {
        match self {
            SourceKind::Google => "google_photos",
            SourceKind::Synology => "synology",
            SourceKind::Telegram => "telegram",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_db_str() == value)
    }

    /// Whether the source hands out items by sequence cursor.
    pub fn is_ordered(self) -> bool {
        matches!(self, SourceKind::Telegram)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Which part of the pool a request draws from.
///
/// `All` parses from the `all` route name but is rejected by the selector:
/// every display request must name exactly one provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFilter {
    All,
    Only(SourceKind),
}

impl SourceFilter {
    /// Parse a route segment. Unknown names yield `None`.
    pub fn from_route(name: &str) -> Option<Self> {
        if name == "all" {
            return Some(SourceFilter::All);
        }
        SourceKind::ALL
            .into_iter()
            .find(|k| k.route_name() == name)
            .map(SourceFilter::Only)
    }

    pub fn kind(self) -> Option<SourceKind> {
        match self {
            SourceFilter::All => None,
            SourceFilter::Only(kind) => Some(kind),
        }
    }
}

impl fmt::Display for SourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFilter::All => f.write_str("all"),
            SourceFilter::Only(kind) => f.write_str(kind.route_name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// `Portrait` iff strictly taller than wide; squares count as landscape.
    pub fn of(width: u32, height: u32) -> Self {
        if height > width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(format!("unknown orientation '{other}'")),
        }
    }
}

/// Pixel dimensions of a canvas or panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn orientation(self) -> Orientation {
        Orientation::of(self.width, self.height)
    }

    /// Swap axes if needed so the geometry has the requested orientation.
    pub fn oriented(self, orientation: Orientation) -> Self {
        if self.orientation() == orientation || self.width == self.height {
            self
        } else {
            Self::new(self.height, self.width)
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

pub type AssetId = i64;

/// Where an asset's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    /// A file on local disk (possibly recorded under a container path prefix).
    Local(PathBuf),
    /// An opaque key fetched from the remote photo service.
    Remote(String),
}

/// One committed photograph in the asset pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoAsset {
    pub id: AssetId,
    pub source: SourceKind,
    pub location: AssetLocation,
    pub width: u32,
    pub height: u32,
    /// Tag computed at ingestion. May be stale; selection re-measures decoded pixels.
    pub orientation: Orientation,
    /// Monotonic cursor for ordered-delivery sources, 0 otherwise.
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
}

/// Stored settings for one known display.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    pub id: i64,
    /// Hostname or IP address the device is looked up by.
    pub host: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub orientation: Option<Orientation>,
    pub enable_collage: bool,
    pub show_date: bool,
    pub show_weather: bool,
    pub weather_lat: Option<f64>,
    pub weather_lon: Option<f64>,
}

/// A single-column update written back to a device profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfileField {
    Width(u32),
    Height(u32),
    Orientation(Orientation),
}

impl ProfileField {
    pub fn column(&self) -> &'static str {
        match self {
            ProfileField::Width(_) => "width",
            ProfileField::Height(_) => "height",
            ProfileField::Orientation(_) => "orientation",
        }
    }
}
