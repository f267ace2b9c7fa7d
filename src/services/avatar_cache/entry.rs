//! Cached avatar entry

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};

/// An avatar image and the moment it was last fetched from any source.
///
/// Entries are never mutated in place; a refresh replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub image: Bytes,
    pub last_refresh: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(image: impl Into<Bytes>, last_refresh: DateTime<Utc>) -> Self {
        Self {
            image: image.into(),
            last_refresh,
        }
    }

    /// Entry refreshed right now
    pub fn refreshed_now(image: impl Into<Bytes>) -> Self {
        Self::new(image, Utc::now())
    }

    /// An entry without image bytes is equivalent to no entry at all
    pub fn is_present(&self) -> bool {
        !self.image.is_empty()
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_refresh
    }

    pub fn is_stale(&self, freshness_window: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) > freshness_window
    }

    /// Present and no older than the freshness window
    pub fn is_fresh(&self, freshness_window: Duration, now: DateTime<Utc>) -> bool {
        self.is_present() && !self.is_stale(freshness_window, now)
    }
}
