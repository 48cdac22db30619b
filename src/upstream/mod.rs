//! Collaborators that reach outside the process: asset bytes, the
//! placeholder image, and current weather.
//!
//! All traits here are synchronous and `Send + Sync`; the pipeline calls them
//! from `tokio::task::spawn_blocking`, so the shipped implementations use
//! `reqwest::blocking`.

pub mod loader;
pub mod placeholder;
pub mod weather;

pub use loader::{AssetLoader, FsAssetLoader};
pub use placeholder::{HttpPlaceholder, PlaceholderProvider};
pub use weather::{OpenMeteo, Weather, WeatherCondition, WeatherProvider};
