//! Error type definitions for the avatar proxy
//!
//! Errors are split by the layer that raises them. Directory and remote
//! fallback failures only ever degrade a single resolution; codec failures
//! fail a single request; configuration failures are fatal at startup.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Directory service errors
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Image transcoding errors
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Remote avatar service errors
    #[error("Remote fallback error: {0}")]
    RemoteFallback(#[from] RemoteFallbackError),

    /// Invalid request
    #[error("Invalid request: {field} - {message}")]
    InvalidRequest { field: String, message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Configuration errors, fatal before serving begins
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration sources could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A required setting is absent or empty
    #[error("Missing required setting: {key}")]
    MissingSetting { key: String },

    /// A setting is present but unusable
    #[error("Invalid setting: {key} - {message}")]
    Invalid { key: String, message: String },
}

/// Directory fetch errors; each one fails the whole refresh pass
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The directory endpoint could not be reached or the TLS upgrade failed
    #[error("Connection to {endpoint} failed: {message}")]
    Connection { endpoint: String, message: String },

    /// Trust material for the directory connection could not be built
    #[error("TLS setup failed: {message}")]
    Tls { message: String },

    /// The bind identity was rejected
    #[error("Bind as {principal} failed: {message}")]
    Auth { principal: String, message: String },

    /// The subtree search failed
    #[error("Search under {base} failed: {message}")]
    Search { base: String, message: String },
}

/// Image transcoding errors
#[derive(Error, Debug)]
pub enum CodecError {
    /// The bytes are not a decodable raster image
    #[error("Failed to decode image: {message}")]
    Decode { message: String },

    /// The image could not be re-encoded to its source format
    #[error("Failed to encode image as {format}: {message}")]
    Encode { format: String, message: String },
}

/// Remote avatar service errors, always non-fatal
#[derive(Error, Debug)]
pub enum RemoteFallbackError {
    /// The remote service answered with anything but 200
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    /// The request could not be sent or the body could not be read
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote service answered 200 with no image
    #[error("Empty response body from {url}")]
    EmptyBody { url: String },
}

impl AppError {
    /// Create an invalid request error
    pub fn invalid_request<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status this error maps to at the request boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        (status, self.to_string()).into_response()
    }
}

impl ConfigError {
    /// Create a missing setting error
    pub fn missing<K: Into<String>>(key: K) -> Self {
        Self::MissingSetting { key: key.into() }
    }

    /// Create an invalid setting error
    pub fn invalid<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl DirectoryError {
    /// Short symbolic tag used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Tls { .. } => "tls",
            Self::Auth { .. } => "auth",
            Self::Search { .. } => "search",
        }
    }
}

impl CodecError {
    /// Create a decode error
    pub fn decode<M: ToString>(message: M) -> Self {
        Self::Decode {
            message: message.to_string(),
        }
    }

    /// Create an encode error
    pub fn encode<F: Into<String>, M: ToString>(format: F, message: M) -> Self {
        Self::Encode {
            format: format.into(),
            message: message.to_string(),
        }
    }
}
