//! Cursor-based delivery for sources that keep an arrival order.
//!
//! A device remembers the last sequence number it showed and asks for the
//! next one. Cursor `0` (a device with no history) gets the newest item; any
//! other cursor gets the oldest item strictly after it. When nothing is
//! newer, the caller answers with no content.

use super::{Selection, SelectionKind, Selector};
use crate::error::FrameError;
use crate::store::AssetStore;
use crate::types::{PhotoAsset, SourceKind};

/// One item served by ordered delivery.
#[derive(Debug, Clone)]
pub struct OrderedItem {
    /// Sequence of the served item, returned so the caller can advance.
    pub sequence: i64,
    pub selection: Selection,
}

/// The asset to deliver after `cursor`, if any.
pub fn next_after(
    store: &dyn AssetStore,
    source: SourceKind,
    cursor: i64,
) -> Result<Option<PhotoAsset>, FrameError> {
    if !source.is_ordered() {
        return Err(FrameError::NotFound(format!(
            "{} has no ordered delivery",
            source.route_name()
        )));
    }
    if cursor <= 0 {
        return Ok(store.newest(source)?);
    }
    Ok(store.ordered_after(source, cursor)?.into_iter().next())
}

impl Selector<'_> {
    /// Load the next ordered item. An unreadable item is replaced by the
    /// placeholder but keeps its sequence.
    pub fn select_ordered(&self, source: SourceKind, cursor: i64) -> Result<Option<OrderedItem>, FrameError> {
        let Some(asset) = next_after(self.store, source, cursor)? else {
            tracing::debug!(%source, cursor, "no newer item");
            return Ok(None);
        };

        let selection = match self.loader.load(&asset) {
            Ok(image) => Selection {
                image,
                kind: SelectionKind::Single(asset.id),
            },
            Err(e) => {
                tracing::warn!(asset = asset.id, sequence = asset.sequence, error = %e, "ordered item unreadable");
                self.placeholder()?
            }
        };
        Ok(Some(OrderedItem {
            sequence: asset.sequence,
            selection,
        }))
    }
}
