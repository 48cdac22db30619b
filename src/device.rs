//! Device resolution: which panel is asking, and at what geometry.
//!
//! A request is matched to a stored [`DeviceProfile`] by hostname hint, then
//! by client address. Header overrides win over stored geometry and are
//! written back to the profile so later requests without headers agree.
//!
//! Two geometries come out of resolution:
//!
//! - **native**: the panel's physical pixel grid, handed to processing.
//! - **logical**: the canvas the photo is composed on. Same pixel count, but
//!   its axes follow the requested orientation.

use crate::store::DeviceProfileStore;
use crate::types::{DeviceProfile, Geometry, Orientation, ProfileField};
use std::net::IpAddr;

/// Panel size assumed for unknown devices.
pub const DEFAULT_GEOMETRY: Geometry = Geometry::new(800, 480);

/// Largest panel edge accepted from headers or stored profiles.
pub const MAX_DIMENSION: u32 = 8192;

/// Raw device hints taken from one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceHints {
    pub hostname: Option<String>,
    pub client_addr: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub orientation: Option<String>,
}

/// Everything later stages need to know about the requesting device.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDevice {
    pub profile_id: Option<i64>,
    pub native: Geometry,
    pub logical: Geometry,
    pub collage: bool,
    pub show_date: bool,
    /// Coordinates to fetch weather for; `None` when weather is off or unplaced.
    pub weather: Option<(f64, f64)>,
}

impl Default for ResolvedDevice {
    fn default() -> Self {
        Self {
            profile_id: None,
            native: DEFAULT_GEOMETRY,
            logical: DEFAULT_GEOMETRY,
            collage: false,
            show_date: false,
            weather: None,
        }
    }
}

/// A profile update to persist after the response is on its way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteBack {
    pub profile_id: i64,
    pub field: ProfileField,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub device: ResolvedDevice,
    pub write_backs: Vec<WriteBack>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn lookup(store: &dyn DeviceProfileStore, key: &str) -> Option<DeviceProfile> {
    match store.find_by_host(key) {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(host = key, error = %e, "device lookup failed");
            None
        }
    }
}

fn valid_dimension(v: u32) -> bool {
    (1..=MAX_DIMENSION).contains(&v)
}

fn parse_dimension_header(name: &str, raw: &str) -> Option<u32> {
    match raw.parse::<u32>() {
        Ok(v) if valid_dimension(v) => Some(v),
        _ => {
            tracing::warn!(header = name, value = raw, "ignoring invalid display dimension");
            None
        }
    }
}

/// Stored geometry, with out-of-range edges replaced by the default.
fn stored_geometry(p: &DeviceProfile) -> Geometry {
    let edge = |v: u32, fallback: u32, column: &str| {
        if valid_dimension(v) {
            v
        } else {
            tracing::warn!(profile = p.id, column, value = v, "ignoring stored display dimension");
            fallback
        }
    };
    Geometry::new(
        edge(p.width, DEFAULT_GEOMETRY.width, "width"),
        edge(p.height, DEFAULT_GEOMETRY.height, "height"),
    )
}

/// Resolve the requesting device and the profile updates its headers imply.
pub fn resolve(store: &dyn DeviceProfileStore, hints: &DeviceHints) -> Resolution {
    let profile = non_empty(&hints.hostname)
        .and_then(|host| lookup(store, host))
        .or_else(|| non_empty(&hints.client_addr).and_then(|addr| lookup(store, addr)));

    let mut device = match &profile {
        Some(p) => ResolvedDevice {
            profile_id: Some(p.id),
            native: stored_geometry(p),
            logical: stored_geometry(p),
            collage: p.enable_collage,
            show_date: p.show_date,
            weather: match (p.show_weather, p.weather_lat, p.weather_lon) {
                (true, Some(lat), Some(lon)) => Some((lat, lon)),
                _ => None,
            },
        },
        None => ResolvedDevice::default(),
    };
    let mut write_backs = Vec::new();
    let mut emit = |field: ProfileField| {
        if let Some(p) = &profile {
            write_backs.push(WriteBack {
                profile_id: p.id,
                field,
            });
        }
    };

    if let Some(w) = non_empty(&hints.width).and_then(|raw| parse_dimension_header("X-Display-Width", raw)) {
        device.native.width = w;
        device.logical.width = w;
        if profile.as_ref().is_some_and(|p| p.width != w) {
            emit(ProfileField::Width(w));
        }
    }
    if let Some(h) = non_empty(&hints.height).and_then(|raw| parse_dimension_header("X-Display-Height", raw)) {
        device.native.height = h;
        device.logical.height = h;
        if profile.as_ref().is_some_and(|p| p.height != h) {
            emit(ProfileField::Height(h));
        }
    }

    let requested = non_empty(&hints.orientation).and_then(|raw| match raw.parse::<Orientation>() {
        Ok(o) => Some(o),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "ignoring display orientation header");
            None
        }
    });
    match requested {
        Some(o) => {
            device.logical = device.logical.oriented(o);
            if profile.as_ref().is_some_and(|p| p.orientation != Some(o)) {
                emit(ProfileField::Orientation(o));
            }
        }
        None => {
            if let Some(o) = profile.as_ref().and_then(|p| p.orientation) {
                device.logical = device.logical.oriented(o);
            }
        }
    }

    tracing::debug!(
        profile = ?device.profile_id,
        native = %device.native,
        logical = %device.logical,
        collage = device.collage,
        "resolved device"
    );
    Resolution {
        device,
        write_backs,
    }
}

/// Persist write-backs, logging failures. Last writer wins.
pub fn apply_write_backs(store: &dyn DeviceProfileStore, write_backs: &[WriteBack]) {
    for wb in write_backs {
        match store.update_field(wb.profile_id, wb.field) {
            Ok(()) => tracing::debug!(profile = wb.profile_id, column = wb.field.column(), "profile updated"),
            Err(e) => tracing::warn!(
                profile = wb.profile_id,
                column = wb.field.column(),
                error = %e,
                "profile write-back failed"
            ),
        }
    }
}

/// Client address for device lookup: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then the socket peer.
pub fn client_address(forwarded_for: Option<&str>, real_ip: Option<&str>, peer: Option<IpAddr>) -> Option<String> {
    forwarded_for
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| real_ip.map(str::trim).filter(|v| !v.is_empty()))
        .map(str::to_string)
        .or_else(|| peer.map(|ip| ip.to_string()))
}
