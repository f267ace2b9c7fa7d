//! Avatar resolution pipeline
//!
//! Preference order for a fingerprint:
//!
//! 1. a fresh cache entry
//! 2. the cache after a full directory refresh pass
//! 3. the remote fallback service, if enabled
//! 4. the embedded default avatar
//!
//! Every successful fetch is written through to the cache, including the
//! default, so identities missing everywhere do not trigger a directory pass
//! on every request. Refreshes run inline in the request that discovered the
//! stale entry; concurrent misses may each run their own pass.

use bytes::Bytes;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::avatar_cache::{AvatarCache, CacheEntry};
use super::remote_fallback::RemoteAvatarSource;
use crate::codec::{self, ResolvedImage};
use crate::config::CacheConfig;
use crate::directory::DirectoryFetcher;
use crate::errors::{AppError, AppResult, DirectoryResult};
use crate::fingerprint::{fingerprints_for, FingerprintAlgorithm};

/// Which step of the pipeline produced the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    CacheHit,
    Refreshed,
    RemoteFallback,
    DefaultFallback,
}

impl ResolutionOutcome {
    /// Short tag used in log lines
    pub fn tag(&self) -> &'static str {
        match self {
            Self::CacheHit => "cached",
            Self::Refreshed => "directory",
            Self::RemoteFallback => "fallback",
            Self::DefaultFallback => "default",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub image: Bytes,
    pub outcome: ResolutionOutcome,
}

pub struct AvatarResolver {
    cache: AvatarCache,
    directory: Arc<dyn DirectoryFetcher>,
    remote: Option<Arc<dyn RemoteAvatarSource>>,
    algorithms: Vec<FingerprintAlgorithm>,
    freshness_window: Duration,
    default_avatar: Bytes,
}

impl AvatarResolver {
    pub fn new(
        cache: AvatarCache,
        directory: Arc<dyn DirectoryFetcher>,
        default_avatar: Bytes,
        config: &CacheConfig,
    ) -> Self {
        Self {
            cache,
            directory,
            remote: None,
            algorithms: config.fingerprint_algorithms.clone(),
            freshness_window: config.freshness_window(),
            default_avatar,
        }
    }

    /// Enable the remote fallback step
    pub fn with_remote(mut self, remote: Arc<dyn RemoteAvatarSource>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn cache(&self) -> &AvatarCache {
        &self.cache
    }

    /// Resolve the raw image bytes for a fingerprint. Never fails: every
    /// failure degrades to the next source, ending at the default avatar.
    pub async fn resolve(&self, fingerprint: &str) -> Resolution {
        if let Some(entry) = self.cache.get(fingerprint).await {
            if entry.is_fresh(self.freshness_window, Utc::now()) {
                debug!(fingerprint = %fingerprint, tag = "cached", "Serving cached avatar");
                return Resolution {
                    image: entry.image,
                    outcome: ResolutionOutcome::CacheHit,
                };
            }
            debug!(fingerprint = %fingerprint, tag = "stale", "Cached avatar is stale");
        }

        self.cache.sweep(self.freshness_window, Utc::now()).await;
        if let Err(e) = self.refresh().await {
            warn!(
                fingerprint = %fingerprint,
                kind = e.kind(),
                "Directory refresh failed, continuing with cached avatars: {}",
                e
            );
        }

        if let Some(entry) = self.cache.get(fingerprint).await {
            info!(fingerprint = %fingerprint, tag = "cached", "Serving avatar after directory refresh");
            return Resolution {
                image: entry.image,
                outcome: ResolutionOutcome::Refreshed,
            };
        }
        info!(fingerprint = %fingerprint, tag = "directory-miss", "No directory avatar");

        if let Some(remote) = &self.remote {
            match remote.fetch(fingerprint).await {
                Ok(image) => {
                    self.cache
                        .put(fingerprint, CacheEntry::refreshed_now(image.clone()))
                        .await;
                    info!(fingerprint = %fingerprint, tag = "fallback", "Serving remote avatar");
                    return Resolution {
                        image,
                        outcome: ResolutionOutcome::RemoteFallback,
                    };
                }
                Err(e) => {
                    info!(fingerprint = %fingerprint, tag = "fallback-miss", "No remote avatar: {}", e);
                }
            }
        }

        self.cache
            .put(fingerprint, CacheEntry::refreshed_now(self.default_avatar.clone()))
            .await;
        info!(fingerprint = %fingerprint, tag = "default", "Serving default avatar");
        Resolution {
            image: self.default_avatar.clone(),
            outcome: ResolutionOutcome::DefaultFallback,
        }
    }

    /// Resolve and transcode to `width` pixels wide
    pub async fn resolve_image(&self, fingerprint: &str, width: u32) -> AppResult<ResolvedImage> {
        let resolution = self.resolve(fingerprint).await;
        let image = resolution.image;

        let transcoded = tokio::task::spawn_blocking(move || codec::transform(&image, width))
            .await
            .map_err(|e| AppError::internal(format!("Transcoding task failed: {}", e)))?;

        let resolved = match transcoded {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(
                    fingerprint = %fingerprint,
                    tag = "codec",
                    step = resolution.outcome.tag(),
                    "Failed to transcode avatar to width {}: {}",
                    width,
                    e
                );
                return Err(e.into());
            }
        };

        debug!(
            fingerprint = %fingerprint,
            tag = resolution.outcome.tag(),
            "Transcoded avatar to {}x{} {}",
            resolved.width,
            resolved.height,
            resolved.format.name()
        );
        Ok(resolved)
    }

    /// Run one directory pass and write every record under every configured
    /// fingerprint algorithm. Returns the number of cache writes.
    pub async fn refresh(&self) -> DirectoryResult<usize> {
        let records = self.directory.fetch_all().await?;
        let now = Utc::now();
        let mut written = 0;

        for record in records {
            for fingerprint in fingerprints_for(&record.identity, &self.algorithms) {
                debug!(fingerprint = %fingerprint, tag = "directory", "Caching directory avatar");
                self.cache
                    .put(fingerprint, CacheEntry::new(record.image.clone(), now))
                    .await;
                written += 1;
            }
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DirectoryRecord;
    use crate::errors::{DirectoryError, RemoteFallbackError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    const DEFAULT: &[u8] = b"default-avatar";
    const UNKNOWN: &str = "00000000000000000000000000000000";

    #[derive(Default)]
    struct StubDirectory {
        records: Vec<DirectoryRecord>,
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DirectoryFetcher for StubDirectory {
        async fn fetch_all(&self) -> DirectoryResult<Vec<DirectoryRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DirectoryError::Connection {
                    endpoint: "ldap.example.com:636".to_string(),
                    message: "connection refused".to_string(),
                });
            }
            Ok(self.records.clone())
        }
    }

    struct StubRemote {
        image: Option<Bytes>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteAvatarSource for StubRemote {
        async fn fetch(&self, fingerprint: &str) -> Result<Bytes, RemoteFallbackError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.image.clone().ok_or_else(|| RemoteFallbackError::Status {
                url: format!("https://avatars.example.com/{}", fingerprint),
                status: 404,
            })
        }
    }

    fn eve() -> DirectoryRecord {
        DirectoryRecord {
            identity: "Eve@Example.com".to_string(),
            image: Bytes::from_static(b"eve-photo"),
        }
    }

    fn resolver(directory: Arc<StubDirectory>) -> AvatarResolver {
        AvatarResolver::new(
            AvatarCache::new(),
            directory,
            Bytes::from_static(DEFAULT),
            &CacheConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_directory_and_remote() {
        let directory = Arc::new(StubDirectory::default());
        let remote = Arc::new(StubRemote {
            image: None,
            calls: AtomicUsize::new(0),
        });
        let resolver = resolver(directory.clone()).with_remote(remote.clone());

        resolver
            .cache()
            .put("abc", CacheEntry::refreshed_now(Bytes::from_static(b"cached")))
            .await;

        let resolution = resolver.resolve("abc").await;
        assert_eq!(resolution.outcome, ResolutionOutcome::CacheHit);
        assert_eq!(resolution.image.as_ref(), b"cached");
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_directory_record_cached_under_every_algorithm() {
        let directory = Arc::new(StubDirectory {
            records: vec![eve()],
            ..StubDirectory::default()
        });
        let resolver = resolver(directory.clone());

        let md5 = FingerprintAlgorithm::Md5.fingerprint("eve@example.com");
        let sha256 = FingerprintAlgorithm::Sha256.fingerprint("eve@example.com");

        let resolution = resolver.resolve(&md5).await;
        assert_eq!(resolution.outcome, ResolutionOutcome::Refreshed);
        assert_eq!(resolution.image.as_ref(), b"eve-photo");

        let resolution = resolver.resolve(&sha256).await;
        assert_eq!(resolution.outcome, ResolutionOutcome::CacheHit);
        assert_eq!(resolution.image.as_ref(), b"eve-photo");
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_triggers_refresh() {
        let directory = Arc::new(StubDirectory {
            records: vec![eve()],
            ..StubDirectory::default()
        });
        let resolver = resolver(directory.clone());
        let md5 = FingerprintAlgorithm::Md5.fingerprint("eve@example.com");

        resolver
            .cache()
            .put(
                md5.clone(),
                CacheEntry::new(Bytes::from_static(b"old-photo"), Utc::now() - Duration::hours(1)),
            )
            .await;

        let resolution = resolver.resolve(&md5).await;
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolution.outcome, ResolutionOutcome::Refreshed);
        assert_eq!(resolution.image.as_ref(), b"eve-photo");
    }

    #[tokio::test]
    async fn test_unknown_identity_without_fallback_gets_default() {
        let directory = Arc::new(StubDirectory {
            records: vec![eve()],
            ..StubDirectory::default()
        });
        let resolver = resolver(directory.clone());

        let resolution = resolver.resolve(UNKNOWN).await;
        assert_eq!(resolution.outcome, ResolutionOutcome::DefaultFallback);
        assert_eq!(resolution.image.as_ref(), DEFAULT);

        // The default is cached, so the next request does not hit the directory
        let resolution = resolver.resolve(UNKNOWN).await;
        assert_eq!(resolution.outcome, ResolutionOutcome::CacheHit);
        assert_eq!(resolution.image.as_ref(), DEFAULT);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_fallback_is_cached() {
        let directory = Arc::new(StubDirectory::default());
        let remote = Arc::new(StubRemote {
            image: Some(Bytes::from_static(b"remote-photo")),
            calls: AtomicUsize::new(0),
        });
        let resolver = resolver(directory).with_remote(remote.clone());

        let resolution = resolver.resolve(UNKNOWN).await;
        assert_eq!(resolution.outcome, ResolutionOutcome::RemoteFallback);
        assert_eq!(resolution.image.as_ref(), b"remote-photo");

        let cached = resolver.cache().get(UNKNOWN).await.unwrap();
        assert_eq!(cached.image.as_ref(), b"remote-photo");
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_miss_falls_through_to_default() {
        let directory = Arc::new(StubDirectory::default());
        let remote = Arc::new(StubRemote {
            image: None,
            calls: AtomicUsize::new(0),
        });
        let resolver = resolver(directory).with_remote(remote.clone());

        let resolution = resolver.resolve(UNKNOWN).await;
        assert_eq!(resolution.outcome, ResolutionOutcome::DefaultFallback);
        assert_eq!(resolution.image.as_ref(), DEFAULT);
        assert_eq!(resolver.cache().get(UNKNOWN).await.unwrap().image.as_ref(), DEFAULT);
        // Not retried
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_directory_failure_degrades_to_default() {
        let directory = Arc::new(StubDirectory {
            fail: true,
            ..StubDirectory::default()
        });
        let resolver = resolver(directory.clone());

        let resolution = resolver.resolve(UNKNOWN).await;
        assert_eq!(resolution.outcome, ResolutionOutcome::DefaultFallback);
        assert!(resolver.refresh().await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_sweeps_stale_entries() {
        let directory = Arc::new(StubDirectory::default());
        let resolver = resolver(directory);
        let old = Utc::now() - Duration::hours(2);

        resolver
            .cache()
            .put("stale-neighbour", CacheEntry::new(Bytes::from_static(b"x"), old))
            .await;

        resolver.resolve(UNKNOWN).await;
        assert!(resolver.cache().get("stale-neighbour").await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_counts_writes() {
        let directory = Arc::new(StubDirectory {
            records: vec![
                eve(),
                DirectoryRecord {
                    identity: "bob@example.com".to_string(),
                    image: Bytes::from_static(b"bob-photo"),
                },
            ],
            ..StubDirectory::default()
        });
        let resolver = resolver(directory);

        assert_eq!(resolver.refresh().await.unwrap(), 4);
        assert_eq!(resolver.cache().len().await, 4);
    }

    #[tokio::test]
    async fn test_resolve_image_fails_on_undecodable_bytes() {
        let resolver = resolver(Arc::new(StubDirectory::default()));
        resolver
            .cache()
            .put("abc", CacheEntry::refreshed_now(Bytes::from_static(b"not an image")))
            .await;

        assert!(matches!(
            resolver.resolve_image("abc", 80).await,
            Err(AppError::Codec(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_codec_failure_is_logged_with_fingerprint() {
        let resolver = resolver(Arc::new(StubDirectory::default()));
        let fingerprint = "0cc175b9c0f1b6a831c399e269772661";
        resolver
            .cache()
            .put(fingerprint, CacheEntry::refreshed_now(Bytes::from_static(b"not an image")))
            .await;

        assert!(resolver.resolve_image(fingerprint, 80).await.is_err());

        logs_assert(|lines: &[&str]| {
            match lines.iter().find(|line| line.contains("Failed to transcode avatar")) {
                Some(line)
                    if line.contains(fingerprint)
                        && line.contains("codec")
                        && line.contains("cached") =>
                {
                    Ok(())
                }
                Some(line) => Err(format!("missing fields in: {}", line)),
                None => Err("no transcode failure logged".to_string()),
            }
        });
    }
}
