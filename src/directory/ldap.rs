use async_trait::async_trait;
use bytes::Bytes;
use ldap3::{DerefAliases, Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{ConnectionMode, DirectoryFetcher, DirectoryRecord, TrustStore};
use crate::config::DirectoryConfig;
use crate::errors::{DirectoryError, DirectoryResult};

/// LDAP-backed directory fetcher
pub struct LdapDirectory {
    config: DirectoryConfig,
    mode: ConnectionMode,
    trust: TrustStore,
}

impl LdapDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        let mode = ConnectionMode::from_config(&config);
        let trust = TrustStore::new(config.ca_cert_file.clone(), config.verify_cert);
        Self {
            config,
            mode,
            trust,
        }
    }

    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.config.server, self.config.port)
    }

    async fn settings(&self) -> DirectoryResult<LdapConnSettings> {
        let mut settings = LdapConnSettings::new().set_conn_timeout(self.config.timeout());

        if self.mode.uses_tls() {
            settings = settings.set_connector(self.trust.connector().await?);
        }
        if self.mode == ConnectionMode::StartTls {
            settings = settings.set_starttls(true);
        }

        Ok(settings)
    }

    async fn bind_and_search(&self, ldap: &mut Ldap) -> DirectoryResult<Vec<DirectoryRecord>> {
        ldap.with_timeout(self.config.timeout())
            .simple_bind(&self.config.bind_user, &self.config.bind_password)
            .await
            .and_then(|result| result.success())
            .map_err(|e| DirectoryError::Auth {
                principal: self.config.bind_user.clone(),
                message: e.to_string(),
            })?;

        let attributes = vec![
            self.config.identity_attribute.as_str(),
            self.config.image_attribute.as_str(),
        ];

        let (entries, _result) = ldap
            .with_search_options(SearchOptions::new().deref(DerefAliases::Never))
            .with_timeout(self.config.timeout())
            .search(
                &self.config.user_base,
                Scope::Subtree,
                &self.config.user_filter,
                attributes,
            )
            .await
            .and_then(|result| result.success())
            .map_err(|e| DirectoryError::Search {
                base: self.config.user_base.clone(),
                message: e.to_string(),
            })?;

        let total = entries.len();
        let records: Vec<DirectoryRecord> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .filter_map(|entry| {
                record_from_entry(
                    &entry,
                    &self.config.identity_attribute,
                    &self.config.image_attribute,
                )
            })
            .collect();

        debug!(
            "Directory search returned {} entries, {} with an identity and a photo",
            total,
            records.len()
        );

        Ok(records)
    }
}

#[async_trait]
impl DirectoryFetcher for LdapDirectory {
    async fn fetch_all(&self) -> DirectoryResult<Vec<DirectoryRecord>> {
        let endpoint = self.endpoint();
        let url = self.mode.url(&self.config.server, self.config.port);
        let settings = self.settings().await?;

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| DirectoryError::Connection {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("Directory connection error: {}", e);
            }
        });

        let result = self.bind_and_search(&mut ldap).await;

        if let Err(e) = ldap.unbind().await {
            debug!("Failed to unbind from {}: {}", endpoint, e);
        }

        if let Ok(records) = &result {
            info!("Fetched {} avatars from directory {}", records.len(), endpoint);
        }
        result
    }
}

/// Build a record from a search entry, skipping entries where either
/// attribute is absent or empty. Attribute names match case-insensitively.
pub fn record_from_entry(
    entry: &SearchEntry,
    identity_attribute: &str,
    image_attribute: &str,
) -> Option<DirectoryRecord> {
    let identity = first_value(&entry.attrs, identity_attribute)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())?;

    // Binary photos land in bin_attrs; values that happen to be valid UTF-8
    // land in attrs.
    let image = first_value(&entry.bin_attrs, image_attribute)
        .map(|value| Bytes::copy_from_slice(value))
        .or_else(|| {
            first_value(&entry.attrs, image_attribute)
                .map(|value| Bytes::copy_from_slice(value.as_bytes()))
        })
        .filter(|image| !image.is_empty())?;

    Some(DirectoryRecord {
        identity: identity.to_string(),
        image,
    })
}

fn first_value<'a, V>(values: &'a HashMap<String, Vec<V>>, name: &str) -> Option<&'a V> {
    values
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
}
