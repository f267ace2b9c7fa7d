/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_AVATAR_SIZE: u32 = 80;
pub const DEFAULT_MAX_AVATAR_SIZE: u32 = 2048;

// Directory defaults
// Note: server, bind credentials and user base have no defaults and must be set
pub const DEFAULT_DIRECTORY_PORT: u16 = 636;
pub const DEFAULT_DIRECTORY_SSL: bool = true;
pub const DEFAULT_DIRECTORY_STARTTLS: bool = false;
pub const DEFAULT_DIRECTORY_VERIFY_CERT: bool = true;
pub const DEFAULT_USER_FILTER: &str = "(objectclass=inetOrgPerson)";
pub const DEFAULT_IDENTITY_ATTRIBUTE: &str = "mail";
pub const DEFAULT_IMAGE_ATTRIBUTE: &str = "jpegPhoto";
pub const DEFAULT_DIRECTORY_TIMEOUT_SECONDS: u64 = 10;

// Remote fallback defaults
pub const DEFAULT_FALLBACK_ENABLED: bool = false;
pub const DEFAULT_FALLBACK_URL: &str = "https://secure.gravatar.com/avatar";
pub const DEFAULT_FALLBACK_SIZE_HINT: u32 = 490;
pub const DEFAULT_FALLBACK_TIMEOUT_SECONDS: u64 = 5;

// Cache defaults
pub const DEFAULT_FRESHNESS_WINDOW_SECONDS: u64 = 30 * 60;

// Environment overrides, e.g. AVATAR_PROXY__DIRECTORY__BIND_PASSWORD
pub const ENV_PREFIX: &str = "AVATAR_PROXY";
pub const ENV_SEPARATOR: &str = "__";
