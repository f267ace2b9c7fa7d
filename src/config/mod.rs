use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;
use crate::fingerprint::FingerprintAlgorithm;

pub mod defaults;
use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Width used when a request carries no usable size parameter
    #[serde(default = "default_avatar_size")]
    pub default_size: u32,
    /// Requested widths above this are clamped
    #[serde(default = "default_max_avatar_size")]
    pub max_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub server: String,
    #[serde(default = "default_directory_port")]
    pub port: u16,
    /// Implicit TLS (ldaps). Takes precedence over `starttls`.
    #[serde(default = "default_directory_ssl")]
    pub ssl: bool,
    /// Upgrade a plaintext connection with STARTTLS
    #[serde(default = "default_directory_starttls")]
    pub starttls: bool,
    #[serde(default = "default_directory_verify_cert")]
    pub verify_cert: bool,
    /// Supplemental PEM CA bundle added to the platform trust store
    #[serde(default)]
    pub ca_cert_file: Option<PathBuf>,
    #[serde(default)]
    pub bind_user: String,
    #[serde(default)]
    pub bind_password: String,
    #[serde(default)]
    pub user_base: String,
    #[serde(default = "default_user_filter")]
    pub user_filter: String,
    #[serde(default = "default_identity_attribute")]
    pub identity_attribute: String,
    #[serde(default = "default_image_attribute")]
    pub image_attribute: String,
    #[serde(default = "default_directory_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_fallback_enabled")]
    pub enabled: bool,
    #[serde(default = "default_fallback_url")]
    pub url: String,
    /// Size requested from the remote service; transcoding happens locally
    #[serde(default = "default_fallback_size_hint")]
    pub size_hint: u32,
    #[serde(default = "default_fallback_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_freshness_window")]
    pub freshness_window_secs: u64,
    /// Every directory identity is cached under each of these digests
    #[serde(default = "default_fingerprint_algorithms")]
    pub fingerprint_algorithms: Vec<FingerprintAlgorithm>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_avatar_size() -> u32 {
    DEFAULT_AVATAR_SIZE
}
fn default_max_avatar_size() -> u32 {
    DEFAULT_MAX_AVATAR_SIZE
}
fn default_directory_port() -> u16 {
    DEFAULT_DIRECTORY_PORT
}
fn default_directory_ssl() -> bool {
    DEFAULT_DIRECTORY_SSL
}
fn default_directory_starttls() -> bool {
    DEFAULT_DIRECTORY_STARTTLS
}
fn default_directory_verify_cert() -> bool {
    DEFAULT_DIRECTORY_VERIFY_CERT
}
fn default_user_filter() -> String {
    DEFAULT_USER_FILTER.to_string()
}
fn default_identity_attribute() -> String {
    DEFAULT_IDENTITY_ATTRIBUTE.to_string()
}
fn default_image_attribute() -> String {
    DEFAULT_IMAGE_ATTRIBUTE.to_string()
}
fn default_directory_timeout() -> u64 {
    DEFAULT_DIRECTORY_TIMEOUT_SECONDS
}
fn default_fallback_enabled() -> bool {
    DEFAULT_FALLBACK_ENABLED
}
fn default_fallback_url() -> String {
    DEFAULT_FALLBACK_URL.to_string()
}
fn default_fallback_size_hint() -> u32 {
    DEFAULT_FALLBACK_SIZE_HINT
}
fn default_fallback_timeout() -> u64 {
    DEFAULT_FALLBACK_TIMEOUT_SECONDS
}
fn default_freshness_window() -> u64 {
    DEFAULT_FRESHNESS_WINDOW_SECONDS
}
fn default_fingerprint_algorithms() -> Vec<FingerprintAlgorithm> {
    vec![FingerprintAlgorithm::Md5, FingerprintAlgorithm::Sha256]
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_size: default_avatar_size(),
            max_size: default_max_avatar_size(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: default_directory_port(),
            ssl: default_directory_ssl(),
            starttls: default_directory_starttls(),
            verify_cert: default_directory_verify_cert(),
            ca_cert_file: None,
            bind_user: String::new(),
            bind_password: String::new(),
            user_base: String::new(),
            user_filter: default_user_filter(),
            identity_attribute: default_identity_attribute(),
            image_attribute: default_image_attribute(),
            timeout_secs: default_directory_timeout(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: default_fallback_enabled(),
            url: default_fallback_url(),
            size_hint: default_fallback_size_hint(),
            timeout_secs: default_fallback_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            freshness_window_secs: default_freshness_window(),
            fingerprint_algorithms: default_fingerprint_algorithms(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then apply
    /// `AVATAR_PROXY__SECTION__KEY` environment overrides, then validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the service cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("directory.server", &self.directory.server),
            ("directory.bind_user", &self.directory.bind_user),
            ("directory.bind_password", &self.directory.bind_password),
            ("directory.user_base", &self.directory.user_base),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::missing(key));
            }
        }

        if self.cache.freshness_window_secs == 0 {
            return Err(ConfigError::invalid(
                "cache.freshness_window_secs",
                "must be greater than zero",
            ));
        }
        if self.cache.fingerprint_algorithms.is_empty() {
            return Err(ConfigError::invalid(
                "cache.fingerprint_algorithms",
                "at least one algorithm is required",
            ));
        }
        if self.fallback.enabled && self.fallback.url.trim().is_empty() {
            return Err(ConfigError::invalid(
                "fallback.url",
                "required when the remote fallback is enabled",
            ));
        }
        Ok(())
    }
}

impl CacheConfig {
    pub fn freshness_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.freshness_window_secs as i64)
    }
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl FallbackConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.directory.server = "ldap.example.com".to_string();
        config.directory.bind_user = "cn=admin,dc=example,dc=com".to_string();
        config.directory.bind_password = "secret".to_string();
        config.directory.user_base = "ou=people,dc=example,dc=com".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.web.default_size, 80);
        assert_eq!(config.directory.port, 636);
        assert!(config.directory.ssl);
        assert!(!config.directory.starttls);
        assert!(config.directory.verify_cert);
        assert_eq!(config.directory.identity_attribute, "mail");
        assert_eq!(config.directory.image_attribute, "jpegPhoto");
        assert!(!config.fallback.enabled);
        assert_eq!(config.cache.freshness_window(), chrono::Duration::minutes(30));
        assert_eq!(
            config.cache.fingerprint_algorithms,
            vec![FingerprintAlgorithm::Md5, FingerprintAlgorithm::Sha256]
        );
    }

    #[test]
    fn test_validate_missing_settings() {
        assert!(valid_config().validate().is_ok());

        let mut config = valid_config();
        config.directory.bind_password = String::new();
        match config.validate() {
            Err(ConfigError::MissingSetting { key }) => {
                assert_eq!(key, "directory.bind_password")
            }
            other => panic!("Expected missing setting, got {:?}", other),
        }

        let mut config = valid_config();
        config.directory.server = "   ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSetting { .. })
        ));
    }

    #[test]
    fn test_validate_invalid_settings() {
        let mut config = valid_config();
        config.cache.fingerprint_algorithms.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = valid_config();
        config.cache.freshness_window_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
[web]
port = 9090

[directory]
server = "ldap.example.com"
port = 389
ssl = false
starttls = true
bind_user = "cn=admin,dc=example,dc=com"
bind_password = "secret"
user_base = "ou=people,dc=example,dc=com"

[fallback]
enabled = true

[cache]
fingerprint_algorithms = ["sha256"]
"#,
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.web.port, 9090);
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.directory.port, 389);
        assert!(!config.directory.ssl);
        assert!(config.directory.starttls);
        assert_eq!(config.directory.user_filter, "(objectclass=inetOrgPerson)");
        assert!(config.fallback.enabled);
        assert_eq!(config.fallback.url, "https://secure.gravatar.com/avatar");
        assert_eq!(
            config.cache.fingerprint_algorithms,
            vec![FingerprintAlgorithm::Sha256]
        );
    }

    #[test]
    fn test_load_rejects_incomplete_file() {
        let file = write_config(
            r#"
[directory]
server = "ldap.example.com"
"#,
        );

        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::MissingSetting { .. })
        ));
    }
}
