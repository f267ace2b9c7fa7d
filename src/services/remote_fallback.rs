//! Remote avatar service used when the directory has no photo

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use tracing::debug;

use crate::config::FallbackConfig;
use crate::errors::{AppError, RemoteFallbackError};

/// A remote source of avatars keyed by fingerprint
#[async_trait]
pub trait RemoteAvatarSource: Send + Sync {
    async fn fetch(&self, fingerprint: &str) -> Result<Bytes, RemoteFallbackError>;
}

/// Gravatar-compatible HTTP client.
///
/// Requests `{base}/{fingerprint}?s={size}&d=404` so that unknown
/// fingerprints produce a 404 instead of a generated image.
#[derive(Clone)]
pub struct GravatarClient {
    client: reqwest::Client,
    base_url: String,
    size_hint: u32,
}

impl GravatarClient {
    pub fn new(config: &FallbackConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("avatar-proxy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            size_hint: config.size_hint,
        })
    }

    pub fn avatar_url(&self, fingerprint: &str) -> String {
        format!(
            "{}/{}?s={}&d={}",
            self.base_url,
            fingerprint,
            self.size_hint,
            StatusCode::NOT_FOUND.as_u16()
        )
    }
}

#[async_trait]
impl RemoteAvatarSource for GravatarClient {
    async fn fetch(&self, fingerprint: &str) -> Result<Bytes, RemoteFallbackError> {
        let url = self.avatar_url(fingerprint);
        debug!("Requesting remote avatar {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| RemoteFallbackError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(RemoteFallbackError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| RemoteFallbackError::Http {
                url: url.clone(),
                source,
            })?;

        if body.is_empty() {
            return Err(RemoteFallbackError::EmptyBody { url });
        }
        Ok(body)
    }
}
