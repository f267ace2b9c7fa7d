//! Trust material for TLS directory connections

use native_tls::{Certificate, TlsConnector};
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

use crate::errors::{DirectoryError, DirectoryResult};

/// Platform trust store plus an optional supplemental CA bundle.
///
/// The connector is built lazily on first use and then reused for the rest
/// of the process lifetime.
pub struct TrustStore {
    ca_cert_file: Option<PathBuf>,
    verify: bool,
    connector: OnceCell<TlsConnector>,
}

impl TrustStore {
    pub fn new(ca_cert_file: Option<PathBuf>, verify: bool) -> Self {
        Self {
            ca_cert_file,
            verify,
            connector: OnceCell::new(),
        }
    }

    pub async fn connector(&self) -> DirectoryResult<TlsConnector> {
        self.connector
            .get_or_try_init(|| async { self.build() })
            .await
            .cloned()
    }

    fn build(&self) -> DirectoryResult<TlsConnector> {
        let mut builder = TlsConnector::builder();

        if let Some(path) = self.ca_cert_file.as_deref() {
            let certificates = load_supplemental_certificates(path);
            debug!(
                "Adding {} supplemental CA certificates from {}",
                certificates.len(),
                path.display()
            );
            for certificate in certificates {
                builder.add_root_certificate(certificate);
            }
        }

        if !self.verify {
            warn!("Directory certificate verification is disabled by configuration");
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }

        builder.build().map_err(|e| DirectoryError::Tls {
            message: e.to_string(),
        })
    }
}

/// Read a PEM bundle. Failures are logged and yield no certificates so the
/// connection can still proceed with the platform trust store.
pub fn load_supplemental_certificates(path: &Path) -> Vec<Certificate> {
    let contents = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(e) => {
            error!("Unable to read CA certificate {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    match Certificate::stack_from_pem(&contents) {
        Ok(certificates) if certificates.is_empty() => {
            error!("Unable to add CA certificate: no certificates in {}", path.display());
            Vec::new()
        }
        Ok(certificates) => certificates,
        Err(e) => {
            error!("Unable to add CA certificate from {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_ca_file_yields_nothing() {
        let certificates = load_supplemental_certificates(Path::new("/path/does/not/exist"));
        assert!(certificates.is_empty());
    }

    #[test]
    fn test_empty_ca_file_yields_nothing() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(load_supplemental_certificates(file.path()).is_empty());
    }

    #[test]
    fn test_unparsable_ca_file_yields_nothing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "-----BEGIN CERTIFICATE-----\nbm90IGEgY2VydGlmaWNhdGU=\n-----END CERTIFICATE-----"
        )
        .unwrap();
        assert!(load_supplemental_certificates(file.path()).is_empty());
    }

    #[tokio::test]
    async fn test_connector_builds_without_supplemental_file() {
        let store = TrustStore::new(Some(PathBuf::from("/path/does/not/exist")), false);
        assert!(store.connector().await.is_ok());
        // Second call reuses the cached connector
        assert!(store.connector().await.is_ok());
    }
}
