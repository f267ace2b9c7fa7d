//! Time-bounded avatar cache
//!
//! Entries are keyed by fingerprint and expire once they are older than the
//! freshness window. Reads share the lock; writes and sweeps take it
//! exclusively for the duration of the map mutation only.

pub mod entry;
pub mod service;

pub use entry::CacheEntry;
pub use service::AvatarCache;
