//! Centralized error handling for the avatar proxy
//!
//! # Error Categories
//!
//! - **Configuration Errors**: missing or invalid settings, fatal at startup
//! - **Directory Errors**: connection, bind, and search failures of a refresh pass
//! - **Codec Errors**: decode and encode failures of a single request
//! - **Remote Fallback Errors**: remote avatar service failures, never fatal

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for directory fetch Results
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Convenience type alias for codec Results
pub type CodecResult<T> = Result<T, CodecError>;
