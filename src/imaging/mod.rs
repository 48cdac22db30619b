//! Canvas composition in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory`, `image::open` |
//! | **Cover fit** | [`cover_crop`] + nearest-neighbour sampling, rows in parallel via `rayon` |
//! | **Collage** | [`compose_collage`]: two cover-fit bands stacked across the short axis |
//! | **Overlay** | gradient + `rusttype` glyphs ([`OverlayRenderer`]) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop, band and gradient math (unit testable)
//! - **Compositor**: Pixel copying into a canvas
//! - **Text**: Font loading and glyph rasterization
//! - **Overlay**: Date and weather decorations on a finished canvas

mod calculations;
mod collage;
mod compositor;
mod overlay;
pub mod text;

pub use calculations::{Rect, StackAxis, collage_slots, cover_crop};
pub use collage::compose_collage;
pub use compositor::{cover_fit, draw_cover};
pub use overlay::{OverlayOptions, OverlayRenderer};
pub use text::FontSet;
