//! Directory service access
//!
//! A fetch pass connects, binds with the configured service identity, runs a
//! single subtree search and yields one [`DirectoryRecord`] per entry that
//! carries both the identity and the image attribute. Any failure fails the
//! whole pass; callers keep serving what the cache already holds.

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::DirectoryConfig;
use crate::errors::DirectoryResult;

pub mod ldap;
pub mod tls;

pub use ldap::LdapDirectory;
pub use tls::TrustStore;

/// One identity/photo pair from a fetch pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    pub identity: String,
    pub image: Bytes,
}

/// Source of every identity/photo pair in the directory
#[async_trait]
pub trait DirectoryFetcher: Send + Sync {
    async fn fetch_all(&self) -> DirectoryResult<Vec<DirectoryRecord>>;
}

/// How the directory connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// TLS from the first byte (ldaps)
    ImplicitTls,
    /// Plaintext connection upgraded with STARTTLS before binding
    StartTls,
    Plaintext,
}

impl ConnectionMode {
    /// Implicit TLS wins when both TLS options are enabled
    pub fn from_config(config: &DirectoryConfig) -> Self {
        if config.ssl {
            Self::ImplicitTls
        } else if config.starttls {
            Self::StartTls
        } else {
            Self::Plaintext
        }
    }

    pub fn uses_tls(&self) -> bool {
        !matches!(self, Self::Plaintext)
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Self::ImplicitTls => "ldaps",
            Self::StartTls | Self::Plaintext => "ldap",
        }
    }

    pub fn url(&self, server: &str, port: u16) -> String {
        format!("{}://{}:{}", self.scheme(), server, port)
    }
}
