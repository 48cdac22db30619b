//! Candidate selection and the smart collage engine.
//!
//! One display request yields exactly one drawable image:
//!
//! ```text
//! draw random asset ──(empty pool / unreadable)──▶ placeholder
//!        │
//!        ▼
//! collage off, or measured orientation == canvas orientation ──▶ single photo
//!        │ mismatch
//!        ▼
//! targeted draw: same orientation as photo 1, id ≠ photo 1 ──(hit)──▶ collage
//!        │ miss
//!        ▼
//! up to MISMATCH_ATTEMPTS unconstrained draws, measured after decode ──(hit)──▶ collage
//!        │ exhausted
//!        ▼
//! self-paired collage (photo 1 in both slots)
//! ```
//!
//! Orientation is always measured on decoded pixels; the stored tag only
//! narrows the targeted draw. Duplicate avoidance compares against photo 1
//! only, so the same second candidate may be drawn more than once.

pub mod ordered;

use crate::error::FrameError;
use crate::imaging::{StackAxis, compose_collage};
use crate::store::{AssetStore, RandomQuery};
use crate::types::{AssetId, Geometry, Orientation, PhotoAsset, SourceFilter, SourceKind};
use crate::upstream::{AssetLoader, PlaceholderProvider};
use image::DynamicImage;

/// Unconstrained draws tried after the targeted draw misses.
pub const MISMATCH_ATTEMPTS: usize = 5;

/// How the returned image was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Single(AssetId),
    Collage {
        first: AssetId,
        second: AssetId,
    },
    /// No partner was found; photo 1 fills both slots.
    SelfPaired(AssetId),
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct Selection {
    /// A single photo at its own size, or a collage already at canvas size.
    pub image: DynamicImage,
    pub kind: SelectionKind,
}

/// Draws candidates from the asset pool. Runs on the blocking pool.
pub struct Selector<'a> {
    store: &'a dyn AssetStore,
    loader: &'a dyn AssetLoader,
    placeholder: &'a dyn PlaceholderProvider,
}

impl<'a> Selector<'a> {
    pub fn new(
        store: &'a dyn AssetStore,
        loader: &'a dyn AssetLoader,
        placeholder: &'a dyn PlaceholderProvider,
    ) -> Self {
        Self {
            store,
            loader,
            placeholder,
        }
    }

    /// Pick the image for a canvas of `canvas` size.
    pub fn select(&self, filter: SourceFilter, canvas: Geometry, collage: bool) -> Result<Selection, FrameError> {
        let source = filter
            .kind()
            .ok_or_else(|| FrameError::InvalidSource(filter.to_string()))?;

        let Some((first, image)) = self.draw(&RandomQuery::any(source)) else {
            return self.placeholder();
        };

        let photo = Orientation::of(image.width(), image.height());
        let target = canvas.orientation();
        if !collage || photo == target {
            tracing::debug!(asset = first.id, %photo, "single photo");
            return Ok(Selection {
                image,
                kind: SelectionKind::Single(first.id),
            });
        }

        let axis = StackAxis::for_canvas(target);
        let kind;
        let composed = match self.find_partner(source, &first, photo) {
            Some((second, partner)) => {
                kind = SelectionKind::Collage {
                    first: first.id,
                    second: second.id,
                };
                compose_collage(&image, &partner, canvas, axis)
            }
            None => {
                tracing::info!(asset = first.id, %photo, "no collage partner found, self-pairing");
                kind = SelectionKind::SelfPaired(first.id);
                compose_collage(&image, &image, canvas, axis)
            }
        };
        Ok(Selection {
            image: DynamicImage::ImageRgba8(composed),
            kind,
        })
    }

    /// Find a second photo with the same measured orientation as the first.
    fn find_partner(
        &self,
        source: SourceKind,
        first: &PhotoAsset,
        wanted: Orientation,
    ) -> Option<(PhotoAsset, DynamicImage)> {
        let targeted = RandomQuery {
            source,
            orientation: Some(wanted),
            exclude: Some(first.id),
        };
        if let Some((asset, image)) = self.draw(&targeted) {
            if asset.id != first.id {
                return Some((asset, image));
            }
        }

        for attempt in 1..=MISMATCH_ATTEMPTS {
            let Some((asset, image)) = self.draw(&RandomQuery::any(source)) else {
                continue;
            };
            let measured = Orientation::of(image.width(), image.height());
            if asset.id != first.id && measured == wanted {
                tracing::debug!(attempt, asset = asset.id, "collage partner found by fallback draw");
                return Some((asset, image));
            }
        }
        None
    }

    /// Draw and decode one asset. Every failure is logged and becomes `None`.
    fn draw(&self, query: &RandomQuery) -> Option<(PhotoAsset, DynamicImage)> {
        let asset = match self.store.random_match(query) {
            Ok(Some(asset)) => asset,
            Ok(None) => {
                tracing::debug!(source = %query.source, orientation = ?query.orientation, "no matching asset");
                return None;
            }
            Err(e) => {
                tracing::warn!(source = %query.source, error = %e, "asset query failed");
                return None;
            }
        };
        match self.loader.load(&asset) {
            Ok(image) => Some((asset, image)),
            Err(e) => {
                tracing::warn!(asset = asset.id, error = %e, "asset could not be loaded");
                None
            }
        }
    }

    pub(crate) fn placeholder(&self) -> Result<Selection, FrameError> {
        tracing::info!("serving placeholder");
        let image = self.placeholder.fetch()?;
        Ok(Selection {
            image,
            kind: SelectionKind::Placeholder,
        })
    }
}
