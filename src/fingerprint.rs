//! Identity fingerprints
//!
//! A fingerprint is the lowercase hex digest of a normalized identity value
//! (trimmed, lower-cased). Callers may hash identities with different
//! algorithms, so directory records are cached under every configured one.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintAlgorithm {
    Md5,
    Sha256,
}

impl FingerprintAlgorithm {
    /// Digest an identity value after normalizing it
    pub fn fingerprint(&self, identity: &str) -> String {
        let normalized = normalize_identity(identity);
        match self {
            Self::Md5 => format!("{:x}", md5::compute(normalized.as_bytes())),
            Self::Sha256 => format!("{:x}", Sha256::digest(normalized.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for FingerprintAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn normalize_identity(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// Fingerprints of one identity under each algorithm, in order
pub fn fingerprints_for(identity: &str, algorithms: &[FingerprintAlgorithm]) -> Vec<String> {
    algorithms
        .iter()
        .map(|algorithm| algorithm.fingerprint(identity))
        .collect()
}

/// Normalize a fingerprint taken from a request path: drop any file
/// extension and lower-case the digest.
pub fn parse_request_fingerprint(segment: &str) -> Option<String> {
    let digest = segment.split('.').next().unwrap_or_default().trim();
    if digest.is_empty() {
        return None;
    }
    Some(digest.to_ascii_lowercase())
}
