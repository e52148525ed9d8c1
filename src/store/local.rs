//! Local file-backed fallback store.
//!
//! Mirrors browser localStorage semantics: a directory-backed key-value
//! bucket where one fixed key holds the entire record list as a single JSON
//! blob. Every mutation is a read-modify-write of the whole blob. Failures
//! here are logged and swallowed; callers always get a usable result.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::TourRecord;

use super::TourBackend;

/// Fixed storage key for the record list.
pub const STORAGE_KEY: &str = "travel_tours_data";

/// Pre-rename storage key, migrated to [`STORAGE_KEY`] on first load.
pub const LEGACY_KEY: &str = "tours";

/// Directory-backed key-value bucket: one JSON file per key.
#[derive(Debug, Clone)]
pub struct LocalBucket {
    dir: PathBuf,
}

impl LocalBucket {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(data) => Some(data),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                tracing::error!("Error reading key {}: {}", key, err);
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.key_path(key), value)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) {
        if let Err(err) = fs::remove_file(self.key_path(key)) {
            if err.kind() != ErrorKind::NotFound {
                tracing::error!("Error removing key {}: {}", key, err);
            }
        }
    }
}

/// Local backend holding the whole record list under one storage key.
#[derive(Debug, Clone)]
pub struct LocalStore {
    bucket: LocalBucket,
}

impl LocalStore {
    pub fn new(bucket: LocalBucket) -> Self {
        Self { bucket }
    }

    /// Load the full record list, migrating the legacy key if present.
    fn load(&self) -> Vec<TourRecord> {
        if let Some(legacy) = self.bucket.get(LEGACY_KEY) {
            if let Err(err) = self.bucket.set(STORAGE_KEY, &legacy) {
                tracing::error!("Error migrating legacy tours key: {}", err);
            } else {
                self.bucket.remove(LEGACY_KEY);
            }
        }

        let Some(data) = self.bucket.get(STORAGE_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&data) {
            Ok(records) => records,
            Err(err) => {
                tracing::error!("Error loading tours: {}", err);
                Vec::new()
            }
        }
    }

    /// Rewrite the full record list. Failures are logged, not raised.
    fn save(&self, records: &[TourRecord]) {
        let data = match serde_json::to_string(records) {
            Ok(data) => data,
            Err(err) => {
                tracing::error!("Error serializing tours: {}", err);
                return;
            }
        };
        if let Err(err) = self.bucket.set(STORAGE_KEY, &data) {
            tracing::error!("Error saving tours: {}", err);
        }
    }
}

#[async_trait]
impl TourBackend for LocalStore {
    async fn list(&self) -> Result<Vec<TourRecord>, AppError> {
        Ok(self.load())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<TourRecord>, AppError> {
        Ok(self.load().into_iter().find(|t| t.id == id))
    }

    async fn create(&self, record: &TourRecord) -> Result<(), AppError> {
        let mut records = self.load();
        records.push(record.clone());
        self.save(&records);
        Ok(())
    }

    async fn update(&self, record: &TourRecord) -> Result<(), AppError> {
        let mut records = self.load();
        // Silently a no-op when the id is unknown.
        if let Some(existing) = records.iter_mut().find(|t| t.id == record.id) {
            *existing = record.clone();
            self.save(&records);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut records = self.load();
        records.retain(|t| t.id != id);
        self.save(&records);
        Ok(())
    }

    async fn replace_all(&self, records: &[TourRecord]) -> Result<(), AppError> {
        self.save(records);
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), AppError> {
        self.bucket.remove(STORAGE_KEY);
        Ok(())
    }
}
