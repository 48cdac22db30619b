//! Storage collaborators: the asset pool and the device profile table.
//!
//! Both are populated by subsystems outside this crate (photo-library
//! ingestion, the settings UI). The composition core only needs the handful
//! of queries below.
//!
//! | Implementation | Use |
//! |---|---|
//! | [`SqliteStore`] | production, the shared SQLite database |
//! | [`MemoryStore`] | tests and embedders that already hold the records |
//!
//! ## Random sampling
//!
//! [`AssetStore::random_match`] must draw uniformly over the matching rows.
//! `SqliteStore` uses `ORDER BY RANDOM() LIMIT 1`, which is uniform but scans
//! every matching row; `MemoryStore` uses `IteratorRandom::choose`, which is
//! also uniform.
//!
//! ## Exclusion
//!
//! [`RandomQuery::exclude`] lets a store answer "random row with orientation
//! Y, excluding id X" in a single call. Stores that cannot honour it may
//! ignore it; the selector re-checks identity itself.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::types::{AssetId, DeviceProfile, Orientation, PhotoAsset, ProfileField, SourceKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("device profile {0} not found")]
    UnknownProfile(i64),
}

/// Parameters of a single random draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomQuery {
    pub source: SourceKind,
    /// Constrain on the stored orientation tag.
    pub orientation: Option<Orientation>,
    pub exclude: Option<AssetId>,
}

impl RandomQuery {
    pub fn any(source: SourceKind) -> Self {
        Self {
            source,
            orientation: None,
            exclude: None,
        }
    }
}

/// Read access to the photo pool.
pub trait AssetStore: Send + Sync {
    /// One asset drawn uniformly at random among the matching rows.
    fn random_match(&self, query: &RandomQuery) -> Result<Option<PhotoAsset>, StoreError>;

    /// Assets of `source` with `sequence > cursor`, ascending by sequence.
    fn ordered_after(&self, source: SourceKind, cursor: i64) -> Result<Vec<PhotoAsset>, StoreError>;

    /// The asset of `source` with the highest sequence.
    fn newest(&self, source: SourceKind) -> Result<Option<PhotoAsset>, StoreError>;
}

/// Lookup and best-effort mutation of device profiles.
pub trait DeviceProfileStore: Send + Sync {
    /// Exact match on the profile's host key (a hostname or an IP address).
    fn find_by_host(&self, host: &str) -> Result<Option<DeviceProfile>, StoreError>;

    fn update_field(&self, id: i64, field: ProfileField) -> Result<(), StoreError>;
}
