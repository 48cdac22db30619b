//! In-memory store backed by plain vectors behind a `Mutex`.

use super::{AssetStore, DeviceProfileStore, RandomQuery, StoreError};
use crate::types::{DeviceProfile, PhotoAsset, ProfileField, SourceKind};
use rand::seq::IteratorRandom;
use std::sync::{Mutex, MutexGuard};

/// Holds assets and profiles in memory. Profile writes mutate the held
/// records, so [`MemoryStore::profile`] shows what the resolver persisted.
#[derive(Default)]
pub struct MemoryStore {
    assets: Mutex<Vec<PhotoAsset>>,
    profiles: Mutex<Vec<DeviceProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assets(assets: Vec<PhotoAsset>) -> Self {
        Self {
            assets: Mutex::new(assets),
            profiles: Mutex::new(Vec::new()),
        }
    }

    pub fn insert_asset(&self, asset: PhotoAsset) -> Result<(), StoreError> {
        lock(&self.assets)?.push(asset);
        Ok(())
    }

    pub fn insert_profile(&self, profile: DeviceProfile) -> Result<(), StoreError> {
        lock(&self.profiles)?.push(profile);
        Ok(())
    }

    pub fn profile(&self, id: i64) -> Option<DeviceProfile> {
        lock(&self.profiles)
            .ok()?
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::Poisoned)
}

impl AssetStore for MemoryStore {
    fn random_match(&self, query: &RandomQuery) -> Result<Option<PhotoAsset>, StoreError> {
        let assets = lock(&self.assets)?;
        let picked = assets
            .iter()
            .filter(|a| a.source == query.source)
            .filter(|a| query.orientation.is_none_or(|o| a.orientation == o))
            .filter(|a| query.exclude != Some(a.id))
            .choose(&mut rand::rng())
            .cloned();
        Ok(picked)
    }

    fn ordered_after(&self, source: SourceKind, cursor: i64) -> Result<Vec<PhotoAsset>, StoreError> {
        let mut matching: Vec<PhotoAsset> = lock(&self.assets)?
            .iter()
            .filter(|a| a.source == source && a.sequence > cursor)
            .cloned()
            .collect();
        matching.sort_by_key(|a| a.sequence);
        Ok(matching)
    }

    fn newest(&self, source: SourceKind) -> Result<Option<PhotoAsset>, StoreError> {
        Ok(lock(&self.assets)?
            .iter()
            .filter(|a| a.source == source)
            .max_by_key(|a| a.sequence)
            .cloned())
    }
}

impl DeviceProfileStore for MemoryStore {
    fn find_by_host(&self, host: &str) -> Result<Option<DeviceProfile>, StoreError> {
        Ok(lock(&self.profiles)?
            .iter()
            .find(|p| p.host == host)
            .cloned())
    }

    fn update_field(&self, id: i64, field: ProfileField) -> Result<(), StoreError> {
        let mut profiles = lock(&self.profiles)?;
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::UnknownProfile(id))?;
        match field {
            ProfileField::Width(w) => profile.width = w,
            ProfileField::Height(h) => profile.height = h,
            ProfileField::Orientation(o) => profile.orientation = Some(o),
        }
        Ok(())
    }
}
