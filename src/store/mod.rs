//! Record store facade.
//!
//! One uniform CRUD/query surface over tour records. A remote backend is
//! preferred whenever one was configured at construction; any remote
//! failure is logged and the call transparently falls back to the local
//! backend. The fallback is per-call, not sticky. Nothing here raises to
//! callers; the worst case is a default/empty result.

mod local;
mod remote;

pub use local::{LocalBucket, LocalStore, LEGACY_KEY, STORAGE_KEY};
pub use remote::{init_database, RemoteStore};

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Region, TourRecord};

/// Storage backend for tour records.
///
/// Implementations handle all storage details; no database types leak
/// through these signatures.
#[async_trait]
pub trait TourBackend: Send + Sync {
    async fn list(&self) -> Result<Vec<TourRecord>, AppError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<TourRecord>, AppError>;
    /// The caller supplies a fully populated record, including its id.
    async fn create(&self, record: &TourRecord) -> Result<(), AppError>;
    async fn update(&self, record: &TourRecord) -> Result<(), AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
    /// Destructive bulk overwrite; not atomic.
    async fn replace_all(&self, records: &[TourRecord]) -> Result<(), AppError>;
    async fn clear_all(&self) -> Result<(), AppError>;
}

/// Facade routing every operation remote-first with local fallback.
pub struct TourStore {
    remote: Option<Arc<dyn TourBackend>>,
    local: Arc<dyn TourBackend>,
}

impl TourStore {
    pub fn new(remote: Option<Arc<dyn TourBackend>>, local: Arc<dyn TourBackend>) -> Self {
        Self { remote, local }
    }

    pub async fn list(&self) -> Vec<TourRecord> {
        if let Some(remote) = &self.remote {
            match remote.list().await {
                Ok(records) => return records,
                Err(err) => {
                    tracing::warn!("Remote list failed, falling back to local store: {}", err)
                }
            }
        }
        self.local.list().await.unwrap_or_default()
    }

    pub async fn get_by_id(&self, id: &str) -> Option<TourRecord> {
        if let Some(remote) = &self.remote {
            match remote.get_by_id(id).await {
                Ok(record) => return record,
                Err(err) => {
                    tracing::warn!("Remote lookup failed, falling back to local store: {}", err)
                }
            }
        }
        self.local.get_by_id(id).await.unwrap_or_default()
    }

    /// Linear scan over `list()`; first match wins on duplicate slugs.
    pub async fn get_by_slug(&self, slug: &str) -> Option<TourRecord> {
        self.list().await.into_iter().find(|t| t.slug == slug)
    }

    pub async fn list_by_region(&self, region: Region) -> Vec<TourRecord> {
        self.list()
            .await
            .into_iter()
            .filter(|t| t.region == region)
            .collect()
    }

    pub async fn create(&self, record: &TourRecord) {
        if let Some(remote) = &self.remote {
            match remote.create(record).await {
                Ok(()) => return,
                Err(err) => {
                    tracing::warn!("Remote create failed, falling back to local store: {}", err)
                }
            }
        }
        if let Err(err) = self.local.create(record).await {
            tracing::error!("Local create failed: {}", err);
        }
    }

    pub async fn update(&self, record: &TourRecord) {
        if let Some(remote) = &self.remote {
            match remote.update(record).await {
                Ok(()) => return,
                Err(err) => {
                    tracing::warn!("Remote update failed, falling back to local store: {}", err)
                }
            }
        }
        if let Err(err) = self.local.update(record).await {
            tracing::error!("Local update failed: {}", err);
        }
    }

    pub async fn delete(&self, id: &str) {
        if let Some(remote) = &self.remote {
            match remote.delete(id).await {
                Ok(()) => return,
                Err(err) => {
                    tracing::warn!("Remote delete failed, falling back to local store: {}", err)
                }
            }
        }
        if let Err(err) = self.local.delete(id).await {
            tracing::error!("Local delete failed: {}", err);
        }
    }

    pub async fn replace_all(&self, records: &[TourRecord]) {
        if let Some(remote) = &self.remote {
            match remote.replace_all(records).await {
                Ok(()) => return,
                Err(err) => tracing::warn!(
                    "Remote replace failed, falling back to local store: {}",
                    err
                ),
            }
        }
        if let Err(err) = self.local.replace_all(records).await {
            tracing::error!("Local replace failed: {}", err);
        }
    }

    pub async fn clear_all(&self) {
        if let Some(remote) = &self.remote {
            match remote.clear_all().await {
                Ok(()) => return,
                Err(err) => {
                    tracing::warn!("Remote clear failed, falling back to local store: {}", err)
                }
            }
        }
        if let Err(err) = self.local.clear_all().await {
            tracing::error!("Local clear failed: {}", err);
        }
    }

    /// Serialize the full record list as pretty-printed JSON.
    pub async fn export_as_text(&self) -> String {
        let records = self.list().await;
        match serde_json::to_string_pretty(&records) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!("Error exporting tours: {}", err);
                "[]".to_string()
            }
        }
    }

    /// Parse the export format and overwrite the store with its contents.
    ///
    /// Anything that is not a JSON array of records is rejected without
    /// touching the store; the failure is logged, not raised.
    pub async fn import_from_text(&self, text: &str) -> bool {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!("Error importing tours: {}", err);
                return false;
            }
        };
        if !value.is_array() {
            tracing::error!("Error importing tours: payload is not an array");
            return false;
        }
        let records: Vec<TourRecord> = match serde_json::from_value(value) {
            Ok(records) => records,
            Err(err) => {
                tracing::error!("Error importing tours: {}", err);
                return false;
            }
        };

        self.replace_all(&records).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Region;
    use tempfile::TempDir;

    /// Backend that fails every operation, standing in for an unreachable
    /// remote database.
    struct FailingBackend;

    #[async_trait]
    impl TourBackend for FailingBackend {
        async fn list(&self) -> Result<Vec<TourRecord>, AppError> {
            Err(AppError::Database("connection refused".to_string()))
        }
        async fn get_by_id(&self, _id: &str) -> Result<Option<TourRecord>, AppError> {
            Err(AppError::Database("connection refused".to_string()))
        }
        async fn create(&self, _record: &TourRecord) -> Result<(), AppError> {
            Err(AppError::Database("connection refused".to_string()))
        }
        async fn update(&self, _record: &TourRecord) -> Result<(), AppError> {
            Err(AppError::Database("connection refused".to_string()))
        }
        async fn delete(&self, _id: &str) -> Result<(), AppError> {
            Err(AppError::Database("connection refused".to_string()))
        }
        async fn replace_all(&self, _records: &[TourRecord]) -> Result<(), AppError> {
            Err(AppError::Database("connection refused".to_string()))
        }
        async fn clear_all(&self) -> Result<(), AppError> {
            Err(AppError::Database("connection refused".to_string()))
        }
    }

    fn record(id: &str, slug: &str, region: Region) -> TourRecord {
        TourRecord {
            id: id.to_string(),
            slug: slug.to_string(),
            title: format!("Tour {}", slug),
            region,
            image: "cover.jpg".to_string(),
            price: None,
            duration: "1 ngày".to_string(),
            transport: "Xe ô tô".to_string(),
            summary: String::new(),
            itinerary: Vec::new(),
            itinerary_text: None,
            included_services: Vec::new(),
            excluded_services: Vec::new(),
            policies: Vec::new(),
            policies_text: None,
            gallery: Vec::new(),
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
            updated_at: "2024-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn local_only(dir: &TempDir) -> TourStore {
        let local = Arc::new(LocalStore::new(LocalBucket::new(dir.path())));
        TourStore::new(None, local)
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_local_without_raising() {
        let dir = TempDir::new().unwrap();
        let local = Arc::new(LocalStore::new(LocalBucket::new(dir.path())));
        let store = TourStore::new(Some(Arc::new(FailingBackend)), local);

        store.create(&record("1", "a", Region::BinhDinh)).await;

        // list() also fails remotely and serves the locally written record.
        let records = store.list().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "1");
    }

    #[tokio::test]
    async fn slug_lookup_returns_first_match() {
        let dir = TempDir::new().unwrap();
        let store = local_only(&dir);

        store.create(&record("1", "dup", Region::BinhDinh)).await;
        store.create(&record("2", "dup", Region::MienNam)).await;

        let found = store.get_by_slug("dup").await.unwrap();
        assert_eq!(found.id, "1");
        assert!(store.get_by_slug("missing").await.is_none());
    }

    #[tokio::test]
    async fn region_filter_preserves_relative_order() {
        let dir = TempDir::new().unwrap();
        let store = local_only(&dir);

        store.create(&record("1", "a", Region::MienBac)).await;
        store.create(&record("2", "b", Region::BinhDinh)).await;
        store.create(&record("3", "c", Region::MienBac)).await;

        let ids: Vec<_> = store
            .list_by_region(Region::MienBac)
            .await
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn export_import_round_trip_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = local_only(&dir);

        store.create(&record("1", "a", Region::BinhDinh)).await;
        store.create(&record("2", "b", Region::MienNam)).await;

        let before = store.list().await;
        let exported = store.export_as_text().await;
        assert!(store.import_from_text(&exported).await);
        assert_eq!(store.list().await, before);
    }

    #[tokio::test]
    async fn import_rejects_non_array_payloads() {
        let dir = TempDir::new().unwrap();
        let store = local_only(&dir);

        store.create(&record("1", "a", Region::BinhDinh)).await;

        assert!(!store.import_from_text("{\"not\": \"an array\"}").await);
        assert!(!store.import_from_text("not json at all").await);
        assert_eq!(store.list().await.len(), 1);
    }
}
