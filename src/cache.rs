//! Short-lived cache of rendered previews.
//!
//! Every frame whose processing produced a preview gets a fresh id and a file
//! `<scratch>/thumb_<id>.jpg`. The response advertises the id, and the
//! companion app fetches the preview shortly after. Each write schedules
//! exactly one deletion [`THUMBNAIL_TTL`] later; reads never extend that.
//!
//! # Design
//!
//! - **Ids** are UUIDv4 in simple form, so they are unguessable and safe as
//!   file names. Lookups still validate them before touching the
//!   filesystem: `""`, `"."`, `".."` and anything with a separator are
//!   rejected.
//! - **Eviction** is a detached tokio task per write. A file that is already
//!   gone (startup sweep, manual cleanup) is not an error.
//! - **Restarts** drop the pending eviction tasks, so [`ThumbnailCache::sweep`]
//!   removes every leftover preview at startup.

use chrono::{DateTime, Utc};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use walkdir::WalkDir;

/// Lifetime of a cached preview.
pub const THUMBNAIL_TTL: Duration = Duration::from_secs(5 * 60);

const FILE_PREFIX: &str = "thumb_";
const FILE_SUFFIX: &str = ".jpg";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("invalid thumbnail id {0:?}")]
    InvalidId(String),
    #[error("thumbnail {0} not found")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A preview written to the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedThumbnail {
    pub id: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    dir: PathBuf,
    ttl: Duration,
}

/// Reject ids that could address anything but a preview file.
pub fn validate_id(id: &str) -> Result<(), CacheError> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidId(id.to_string()))
    }
}

fn is_preview_file(name: &str) -> bool {
    name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX)
}

impl ThumbnailCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_ttl(dir, THUMBNAIL_TTL)
    }

    pub fn with_ttl(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{id}{FILE_SUFFIX}"))
    }

    /// Store `bytes` under a fresh id and schedule its deletion.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn put(&self, bytes: &[u8]) -> Result<CachedThumbnail, CacheError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let path = self.path_for(&id);
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(id = %id, bytes = bytes.len(), "cached thumbnail");

        let ttl = self.ttl;
        let evict_path = path.clone();
        let evict_id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            match tokio::fs::remove_file(&evict_path).await {
                Ok(()) => tracing::debug!(id = %evict_id, "evicted thumbnail"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(id = %evict_id, error = %e, "thumbnail eviction failed"),
            }
        });

        Ok(CachedThumbnail {
            id,
            path,
            created_at: Utc::now(),
        })
    }

    /// Read a preview. Does not extend its lifetime.
    pub async fn get(&self, id: &str) -> Result<Vec<u8>, CacheError> {
        validate_id(id)?;
        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CacheError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every leftover preview in the scratch directory.
    pub fn sweep(&self) -> Result<SweepStats, CacheError> {
        let mut stats = SweepStats::default();
        if !self.dir.exists() {
            return Ok(stats);
        }
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| io::Error::other(e.to_string()))?;
            let name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_file() || !is_preview_file(&name) {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => stats.removed += 1,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "could not remove stale thumbnail");
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }
}

/// Outcome of a startup sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub removed: u32,
    pub failed: u32,
}

impl fmt::Display for SweepStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed > 0 {
            write!(f, "{} stale thumbnails removed, {} failed", self.removed, self.failed)
        } else {
            write!(f, "{} stale thumbnails removed", self.removed)
        }
    }
}
