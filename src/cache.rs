//! Last-known snapshot per target.
//!
//! This module provides the `SnapshotCache` that pollers read before diffing
//! and overwrite after publishing. Entries are replaced wholesale, never
//! merged. The cache also carries the generation counter used to reject
//! writes from pollers that belong to a superseded set of targets.

use ahash::AHashMap as HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::model::Snapshot;

#[derive(Default)]
struct CacheInner {
    generation: u64,
    snapshots: HashMap<String, Arc<Snapshot>>,
}

/// Snapshot storage shared by all pollers of the exporter.
#[derive(Default)]
pub struct SnapshotCache {
    inner: RwLock<CacheInner>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last committed snapshot for `key`.
    pub async fn get(&self, key: &str) -> Option<Arc<Snapshot>> {
        self.inner.read().await.snapshots.get(key).cloned()
    }

    /// Current generation; pollers are bound to the value seen at spawn time.
    pub async fn generation(&self) -> u64 {
        self.inner.read().await.generation
    }

    /// Number of targets with a committed snapshot.
    pub async fn len(&self) -> usize {
        self.inner.read().await.snapshots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.snapshots.is_empty()
    }

    /// Total instances over all committed snapshots.
    pub async fn instance_count(&self) -> usize {
        self.inner
            .read()
            .await
            .snapshots
            .values()
            .map(|s| s.len())
            .sum()
    }

    /// Starts a new generation.
    ///
    /// Drops every entry and runs `on_reset` while holding the exclusive
    /// lock, so no commit of the previous generation can interleave with
    /// it. Returns the new generation.
    pub async fn reset<F: FnOnce()>(&self, on_reset: F) -> u64 {
        let mut inner = self.inner.write().await;
        inner.generation += 1;
        inner.snapshots.clear();
        on_reset();
        inner.generation
    }

    /// Commits `snapshot` for `key` if `generation` is still current.
    ///
    /// `publish` runs under the exclusive lock right before the entry is
    /// replaced. When the generation is stale neither happens and `false`
    /// is returned.
    pub async fn commit<F: FnOnce()>(
        &self,
        generation: u64,
        key: &str,
        snapshot: Snapshot,
        publish: F,
    ) -> bool {
        let mut inner = self.inner.write().await;
        if inner.generation != generation {
            return false;
        }
        publish();
        inner.snapshots.insert(key.to_string(), Arc::new(snapshot));
        true
    }
}
