//! In-memory avatar cache shared by every request and refresh pass

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::entry::CacheEntry;

/// Fingerprint to avatar mapping.
///
/// Cloning the handle shares the underlying map. The lock is only held while
/// the map itself is inspected or mutated, so callers never hold it across
/// network I/O.
#[derive(Clone, Default)]
pub struct AvatarCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl AvatarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry. Entries without image bytes are reported as absent.
    pub async fn get(&self, fingerprint: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        entries
            .get(fingerprint)
            .filter(|entry| entry.is_present())
            .cloned()
    }

    /// Replace any existing entry for the fingerprint
    pub async fn put(&self, fingerprint: impl Into<String>, entry: CacheEntry) {
        let mut entries = self.entries.write().await;
        entries.insert(fingerprint.into(), entry);
    }

    pub async fn delete(&self, fingerprint: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(fingerprint);
    }

    /// Evict every present entry older than the freshness window.
    ///
    /// Returns the number of evicted entries.
    pub async fn sweep(&self, freshness_window: Duration, now: DateTime<Utc>) -> usize {
        let evicted: Vec<String> = {
            let mut entries = self.entries.write().await;
            let stale: Vec<String> = entries
                .iter()
                .filter(|(_, entry)| entry.is_present() && entry.is_stale(freshness_window, now))
                .map(|(fingerprint, _)| fingerprint.clone())
                .collect();
            for fingerprint in &stale {
                entries.remove(fingerprint);
            }
            stale
        };

        for fingerprint in &evicted {
            info!(fingerprint = %fingerprint, tag = "evicted", "Evicted stale avatar");
        }
        if !evicted.is_empty() {
            debug!("Cache sweep evicted {} entries", evicted.len());
        }

        evicted.len()
    }

    /// Number of entries currently held, including empty ones
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
