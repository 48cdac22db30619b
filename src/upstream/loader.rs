//! Fetching and decoding asset content.

use crate::error::FrameError;
use crate::types::{AssetLocation, PhotoAsset};
use image::{DynamicImage, ImageReader};
use reqwest::blocking::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Container prefixes that older ingestion runs recorded in asset paths.
const LEGACY_PREFIXES: &[&str] = &["/data/", "/app/data/"];

/// Turns an asset record into decoded pixels. Called from the blocking pool.
pub trait AssetLoader: Send + Sync {
    fn load(&self, asset: &PhotoAsset) -> Result<DynamicImage, FrameError>;
}

/// Reads local assets from disk and remote assets from the photo service.
pub struct FsAssetLoader {
    data_dir: PathBuf,
    remote: Option<RemoteFetcher>,
}

struct RemoteFetcher {
    client: Client,
    base_url: String,
}

impl FsAssetLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            remote: None,
        }
    }

    /// Enable remote keys, fetched as `GET <base_url>/<key>`.
    pub fn with_remote(mut self, base_url: &str, timeout: Duration) -> Result<Self, FrameError> {
        let client = Client::builder().timeout(timeout).build()?;
        self.remote = Some(RemoteFetcher {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        });
        Ok(self)
    }

    fn load_remote(&self, key: &str) -> Result<DynamicImage, FrameError> {
        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| FrameError::Upstream("no remote photo service configured".into()))?;
        let url = format!("{}/{}", remote.base_url, key);
        let response = remote.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FrameError::Upstream(format!(
                "remote photo {key} returned status {}",
                status.as_u16()
            )));
        }
        Ok(image::load_from_memory(&response.bytes()?)?)
    }
}

/// Resolve a recorded path against the data directory.
///
/// A path that exists is used as-is. Otherwise a legacy container prefix is
/// replaced by `data_dir` if the remapped file exists.
pub fn resolve_path(recorded: &Path, data_dir: &Path) -> PathBuf {
    if recorded.exists() {
        return recorded.to_path_buf();
    }
    let Some(text) = recorded.to_str() else {
        return recorded.to_path_buf();
    };
    LEGACY_PREFIXES
        .iter()
        .filter_map(|prefix| text.strip_prefix(prefix))
        .map(|rel| data_dir.join(rel))
        .find(|candidate| candidate.exists())
        .unwrap_or_else(|| recorded.to_path_buf())
}

fn decode_file(path: &Path) -> Result<DynamicImage, FrameError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    Ok(reader.decode()?)
}

impl AssetLoader for FsAssetLoader {
    fn load(&self, asset: &PhotoAsset) -> Result<DynamicImage, FrameError> {
        match &asset.location {
            AssetLocation::Local(path) => {
                let resolved = resolve_path(path, &self.data_dir);
                decode_file(&resolved)
            }
            AssetLocation::Remote(key) => self.load_remote(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{asset_at, write_png};
    use crate::types::SourceKind;
    use tempfile::TempDir;

    #[test]
    fn existing_path_is_kept() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.png");
        write_png(&file, 4, 4);
        assert_eq!(resolve_path(&file, Path::new("/elsewhere")), file);
    }

    #[test]
    fn legacy_prefix_is_remapped_when_target_exists() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("photos")).unwrap();
        write_png(&tmp.path().join("photos/b.png"), 4, 4);

        for recorded in ["/data/photos/b.png", "/app/data/photos/b.png"] {
            assert_eq!(
                resolve_path(Path::new(recorded), tmp.path()),
                tmp.path().join("photos/b.png")
            );
        }
    }

    #[test]
    fn unresolvable_path_is_returned_unchanged() {
        let tmp = TempDir::new().unwrap();
        let recorded = Path::new("/data/photos/missing.png");
        assert_eq!(resolve_path(recorded, tmp.path()), recorded);
    }

    #[test]
    fn loads_local_asset_through_remap() {
        let tmp = TempDir::new().unwrap();
        write_png(&tmp.path().join("c.png"), 30, 20);
        let loader = FsAssetLoader::new(tmp.path());
        let img = loader
            .load(&asset_at(1, SourceKind::Google, "/data/c.png"))
            .unwrap();
        assert_eq!((img.width(), img.height()), (30, 20));
    }

    #[test]
    fn missing_or_corrupt_file_errors() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("bad.png"), b"garbage").unwrap();
        let loader = FsAssetLoader::new(tmp.path());

        let missing = asset_at(1, SourceKind::Google, "/nope/none.png");
        assert!(matches!(loader.load(&missing), Err(FrameError::Io(_))));

        let corrupt = asset_at(2, SourceKind::Google, tmp.path().join("bad.png").to_str().unwrap());
        assert!(loader.load(&corrupt).is_err());
    }

    #[test]
    fn remote_without_service_errors() {
        let loader = FsAssetLoader::new("/tmp");
        let mut remote = asset_at(3, SourceKind::Synology, "x");
        remote.location = AssetLocation::Remote("key".into());
        assert!(matches!(loader.load(&remote), Err(FrameError::Upstream(_))));
    }
}
