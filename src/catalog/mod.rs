//! In-memory catalog projection.
//!
//! Holds the current snapshot of all tour records for display and exposes
//! region-filtered views. Mutations update the snapshot optimistically
//! before the store call settles, so the snapshot can diverge from
//! persisted truth until the next reload; an accepted trade-off for a
//! single-admin deployment. Other projection instances learn about
//! mutations through the change channel and may reload themselves.

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::models::{Region, TourRecord};
use crate::store::TourStore;

/// Snapshot lifecycle: nothing loaded yet, a reload in flight, or ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Uninitialized,
    Loading,
    Ready,
}

/// Broadcast on every mutation so independent views can reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEvent {
    Changed,
}

pub struct Catalog {
    store: Arc<TourStore>,
    snapshot: RwLock<Vec<TourRecord>>,
    state: RwLock<LoadState>,
    changes: broadcast::Sender<CatalogEvent>,
}

impl Catalog {
    pub fn new(store: Arc<TourStore>) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            store,
            snapshot: RwLock::new(Vec::new()),
            state: RwLock::new(LoadState::Uninitialized),
            changes,
        }
    }

    pub async fn state(&self) -> LoadState {
        *self.state.read().await
    }

    /// Replace the snapshot wholesale from the store.
    ///
    /// The store never raises; an empty result (for example after every
    /// backend failed) leaves an empty catalog rather than resurrecting
    /// stale or demo data.
    pub async fn refresh(&self) {
        *self.state.write().await = LoadState::Loading;
        let records = self.store.list().await;
        tracing::debug!("Catalog refreshed with {} tours", records.len());
        *self.snapshot.write().await = records;
        *self.state.write().await = LoadState::Ready;
    }

    pub async fn tours(&self) -> Vec<TourRecord> {
        self.snapshot.read().await.clone()
    }

    /// Pure filter over the current snapshot.
    pub async fn by_region(&self, region: Region) -> Vec<TourRecord> {
        self.snapshot
            .read()
            .await
            .iter()
            .filter(|t| t.region == region)
            .cloned()
            .collect()
    }

    pub async fn get_by_slug(&self, slug: &str) -> Option<TourRecord> {
        self.snapshot
            .read()
            .await
            .iter()
            .find(|t| t.slug == slug)
            .cloned()
    }

    /// Append to the snapshot, then persist.
    pub async fn add(&self, record: TourRecord) {
        self.snapshot.write().await.push(record.clone());
        self.store.create(&record).await;
        let _ = self.changes.send(CatalogEvent::Changed);
    }

    /// Replace the matching snapshot entry, then persist.
    pub async fn update(&self, record: TourRecord) {
        {
            let mut snapshot = self.snapshot.write().await;
            if let Some(existing) = snapshot.iter_mut().find(|t| t.id == record.id) {
                *existing = record.clone();
            }
        }
        self.store.update(&record).await;
        let _ = self.changes.send(CatalogEvent::Changed);
    }

    /// Filter out of the snapshot, then persist.
    pub async fn remove(&self, id: &str) {
        self.snapshot.write().await.retain(|t| t.id != id);
        self.store.delete(id).await;
        let _ = self.changes.send(CatalogEvent::Changed);
    }

    /// Subscribe to mutation notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.changes.subscribe()
    }
}
