//! # Photoframe Server
//!
//! Serves one composed image per request to e-paper photo frames. Each
//! request picks photographs from a mixed-provenance pool, arranges them for
//! the requesting panel's geometry, optionally draws the date and current
//! weather, and hands the canvas to a processing step that produces the
//! bytes the panel can show.
//!
//! # Architecture: One Pipeline Per Request
//!
//! ```text
//! 1. Resolve    headers + profile  →  native / logical geometry, toggles
//! 2. Select     asset pool         →  one photo, a collage, or the placeholder
//! 3. Compose    selection          →  cover-fit canvas + overlay
//! 4. Process    canvas             →  final PNG (+ optional preview)
//! 5. Advertise  preview            →  short-lived thumbnail cache entry
//! ```
//!
//! Every stage talks to the outside world through a small synchronous trait
//! (`AssetStore`, `AssetLoader`, `WeatherProvider`, ...), so unit tests run
//! the whole pipeline against in-memory fakes without a database, network
//! or external tool.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`server`] | axum routes, header parsing, error → status mapping |
//! | [`pipeline`] | Sequences the stages on the blocking pool |
//! | [`device`] | Profile lookup, header overrides, geometry resolution |
//! | [`select`] | Random draws, smart collage pairing, ordered delivery |
//! | [`imaging`] | Cover-fit compositor, collage layout, date/weather overlay |
//! | [`processing`] | Processing delegates: external command or in-process |
//! | [`cache`] | Time-bounded preview cache in the scratch directory |
//! | [`store`] | Asset pool and device profile stores (SQLite, in-memory) |
//! | [`upstream`] | Asset loading, placeholder image, Open-Meteo weather |
//! | [`config`] | Sparse `config.toml` loading and validation |
//! | [`types`] | Shared domain types (`SourceKind`, `Geometry`, `PhotoAsset`, ...) |
//! | [`error`] | The pipeline's error taxonomy |
//!
//! # Design Decisions
//!
//! ## Measured Orientation
//!
//! Stored orientation tags can be stale (rotated files, bad ingestion), so
//! the collage engine decides on decoded pixel dimensions. Tags are only used
//! to narrow the targeted partner draw.
//!
//! ## Degrade, Don't Fail
//!
//! A frame on the wall is better than an error page nobody reads. Missing
//! files, corrupt bytes and empty pools fall back to the placeholder; a dead
//! weather service just drops the weather block. The caller sees a 5xx only
//! when there is nothing at all to draw or the processing step fails.
//!
//! ## Native vs. Logical Geometry
//!
//! The canvas is composed in the orientation the viewer sees (logical),
//! while the processing step is told the panel's physical grid (native) and
//! decides about rotation itself.

pub mod cache;
pub mod config;
pub mod device;
pub mod error;
pub mod imaging;
pub mod pipeline;
pub mod processing;
pub mod select;
pub mod server;
pub mod store;
pub mod types;
pub mod upstream;

#[cfg(test)]
pub(crate) mod test_helpers;
