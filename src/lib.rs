//! Avatar proxy
//!
//! Resolves identity fingerprints to avatar images from an in-memory cache,
//! a directory service, an optional remote avatar service, and finally an
//! embedded default, then transcodes the result to the requested width.

pub mod assets;
pub mod codec;
pub mod config;
pub mod directory;
pub mod errors;
pub mod fingerprint;
pub mod services;
pub mod web;
