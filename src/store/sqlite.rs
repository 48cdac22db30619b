//! SQLite-backed store over the shared frame database.
//!
//! Table and column names follow the database the ingestion services write
//! (`images`, `devices`), including soft deletion via `deleted_at`. Missing
//! tables are created on open so a fresh database works; no migrations are
//! attempted.

use super::{AssetStore, DeviceProfileStore, RandomQuery, StoreError};
use crate::types::{
    AssetLocation, DeviceProfile, Orientation, PhotoAsset, ProfileField, SourceKind,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS images (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path          TEXT NOT NULL DEFAULT '',
    caption            TEXT NOT NULL DEFAULT '',
    width              INTEGER NOT NULL DEFAULT 0,
    height             INTEGER NOT NULL DEFAULT 0,
    orientation        TEXT NOT NULL DEFAULT 'landscape',
    source             TEXT NOT NULL DEFAULT '',
    synology_photo_id  INTEGER NOT NULL DEFAULT 0,
    thumbnail_key      TEXT NOT NULL DEFAULT '',
    telegram_update_id INTEGER NOT NULL DEFAULT 0,
    created_at         DATETIME,
    deleted_at         DATETIME
);
CREATE INDEX IF NOT EXISTS idx_images_source ON images(source, orientation);
CREATE TABLE IF NOT EXISTS devices (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    name           TEXT NOT NULL DEFAULT '',
    host           TEXT NOT NULL DEFAULT '',
    width          INTEGER NOT NULL DEFAULT 800,
    height         INTEGER NOT NULL DEFAULT 480,
    orientation    TEXT NOT NULL DEFAULT '',
    enable_collage BOOLEAN NOT NULL DEFAULT 0,
    show_date      BOOLEAN NOT NULL DEFAULT 0,
    show_weather   BOOLEAN NOT NULL DEFAULT 0,
    weather_lat    REAL,
    weather_lon    REAL,
    created_at     DATETIME
);
";

const IMAGE_COLUMNS: &str = "id, file_path, width, height, orientation, source, \
     thumbnail_key, telegram_update_id, created_at";

const DEVICE_COLUMNS: &str = "id, name, host, width, height, orientation, enable_collage, \
     show_date, show_weather, weather_lat, weather_lon";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure both tables exist.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn, path.to_path_buf())
    }

    /// Private in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, path: PathBuf) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert an asset row. Ingestion normally does this; exposed for seeding.
    pub fn insert_asset(&self, asset: &PhotoAsset) -> Result<i64, StoreError> {
        let (file_path, key) = match &asset.location {
            AssetLocation::Local(p) => (p.to_string_lossy().into_owned(), String::new()),
            AssetLocation::Remote(k) => (String::new(), k.clone()),
        };
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO images (file_path, width, height, orientation, source, thumbnail_key,
                                 telegram_update_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                file_path,
                asset.width,
                asset.height,
                asset.orientation.as_str(),
                asset.source.as_db_str(),
                key,
                asset.sequence,
                asset.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a device row. The settings UI normally does this.
    pub fn insert_profile(&self, profile: &DeviceProfile) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO devices (name, host, width, height, orientation, enable_collage,
                                  show_date, show_weather, weather_lat, weather_lon)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                profile.name,
                profile.host,
                profile.width,
                profile.height,
                profile.orientation.map(|o| o.as_str()).unwrap_or(""),
                profile.enable_collage,
                profile.show_date,
                profile.show_weather,
                profile.weather_lat,
                profile.weather_lon,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

fn dimension(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Timestamps come from several writers; accept the common shapes and fall
/// back to the epoch rather than failing the row.
fn parse_timestamp(raw: Option<String>) -> DateTime<Utc> {
    let Some(raw) = raw else {
        return DateTime::UNIX_EPOCH;
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(dt) = DateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return dt.with_timezone(&Utc);
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn asset_from_row(row: &Row) -> rusqlite::Result<Option<PhotoAsset>> {
    let source: String = row.get("source")?;
    // Rows from sources this server does not know about are skipped.
    let Some(source) = SourceKind::from_db_str(&source) else {
        return Ok(None);
    };
    let width = dimension(row.get("width")?);
    let height = dimension(row.get("height")?);
    let orientation: String = row.get("orientation")?;
    let orientation = orientation
        .parse()
        .unwrap_or_else(|_| Orientation::of(width, height));
    let file_path: String = row.get("file_path")?;
    let key: String = row.get("thumbnail_key")?;
    let location = if source == SourceKind::Synology && !key.is_empty() {
        AssetLocation::Remote(key)
    } else {
        AssetLocation::Local(PathBuf::from(file_path))
    };

    Ok(Some(PhotoAsset {
        id: row.get("id")?,
        source,
        location,
        width,
        height,
        orientation,
        sequence: row.get("telegram_update_id")?,
        created_at: parse_timestamp(row.get("created_at")?),
    }))
}

fn profile_from_row(row: &Row) -> rusqlite::Result<DeviceProfile> {
    let orientation: String = row.get("orientation")?;
    Ok(DeviceProfile {
        id: row.get("id")?,
        name: row.get("name")?,
        host: row.get("host")?,
        width: dimension(row.get("width")?),
        height: dimension(row.get("height")?),
        orientation: orientation.parse().ok(),
        enable_collage: row.get("enable_collage")?,
        show_date: row.get("show_date")?,
        show_weather: row.get("show_weather")?,
        weather_lat: row.get("weather_lat")?,
        weather_lon: row.get("weather_lon")?,
    })
}

impl AssetStore for SqliteStore {
    fn random_match(&self, query: &RandomQuery) -> Result<Option<PhotoAsset>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {IMAGE_COLUMNS} FROM images
             WHERE deleted_at IS NULL
               AND source = ?1
               AND (?2 IS NULL OR orientation = ?2)
               AND (?3 IS NULL OR id != ?3)
             ORDER BY RANDOM() LIMIT 1"
        );
        let row = conn
            .query_row(
                &sql,
                params![
                    query.source.as_db_str(),
                    query.orientation.map(|o| o.as_str()),
                    query.exclude,
                ],
                asset_from_row,
            )
            .optional()?;
        Ok(row.flatten())
    }

    fn ordered_after(&self, source: SourceKind, cursor: i64) -> Result<Vec<PhotoAsset>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {IMAGE_COLUMNS} FROM images
             WHERE deleted_at IS NULL AND source = ?1 AND telegram_update_id > ?2
             ORDER BY telegram_update_id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![source.as_db_str(), cursor], asset_from_row)?;
        let mut assets = Vec::new();
        for row in rows {
            if let Some(asset) = row? {
                assets.push(asset);
            }
        }
        Ok(assets)
    }

    fn newest(&self, source: SourceKind) -> Result<Option<PhotoAsset>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {IMAGE_COLUMNS} FROM images
             WHERE deleted_at IS NULL AND source = ?1
             ORDER BY telegram_update_id DESC LIMIT 1"
        );
        let row = conn
            .query_row(&sql, params![source.as_db_str()], asset_from_row)
            .optional()?;
        Ok(row.flatten())
    }
}

impl DeviceProfileStore for SqliteStore {
    fn find_by_host(&self, host: &str) -> Result<Option<DeviceProfile>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE host = ?1 LIMIT 1");
        Ok(conn
            .query_row(&sql, params![host], profile_from_row)
            .optional()?)
    }

    fn update_field(&self, id: i64, field: ProfileField) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = match field {
            ProfileField::Width(w) => {
                conn.execute("UPDATE devices SET width = ?1 WHERE id = ?2", params![w, id])?
            }
            ProfileField::Height(h) => {
                conn.execute("UPDATE devices SET height = ?1 WHERE id = ?2", params![h, id])?
            }
            ProfileField::Orientation(o) => conn.execute(
                "UPDATE devices SET orientation = ?1 WHERE id = ?2",
                params![o.as_str(), id],
            )?,
        };
        if changed == 0 {
            return Err(StoreError::UnknownProfile(id));
        }
        Ok(())
    }
}
