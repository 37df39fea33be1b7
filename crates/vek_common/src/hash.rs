//! Content fingerprints for cache invalidation.

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Number of hex characters kept from a full digest.
///
/// Fingerprints are only ever compared against earlier fingerprints of the
/// same path, so a short prefix is enough.
pub const FINGERPRINT_LEN: usize = 16;

/// Digest algorithm used to fingerprint file contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// MD5.
    Md5,
    /// SHA-1.
    Sha1,
    /// SHA-256 (default).
    #[default]
    Sha256,
}

impl HashAlgorithm {
    /// Returns the lowercase name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    /// Creates an incremental hasher for this algorithm.
    pub fn hasher(self) -> FingerprintHasher {
        let state = match self {
            HashAlgorithm::Md5 => HasherState::Md5(Md5::new()),
            HashAlgorithm::Sha1 => HasherState::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
        };
        FingerprintHasher { state }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for parsing hash algorithm names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hash algorithm '{input}' (expected md5, sha1 or sha256)")]
pub struct ParseHashAlgorithmError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for HashAlgorithm {
    type Err = ParseHashAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            _ => Err(ParseHashAlgorithmError {
                input: s.to_string(),
            }),
        }
    }
}

enum HasherState {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
}

/// Incremental fingerprint computation, fed in chunks.
pub struct FingerprintHasher {
    state: HasherState,
}

impl FingerprintHasher {
    /// Feeds more bytes into the digest.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Md5(h) => h.update(data),
            HasherState::Sha1(h) => h.update(data),
            HasherState::Sha256(h) => h.update(data),
        }
    }

    /// Finalizes the digest into a truncated fingerprint.
    pub fn finish(self) -> Fingerprint {
        let mut hex = match self.state {
            HasherState::Md5(h) => hex::encode(h.finalize()),
            HasherState::Sha1(h) => hex::encode(h.finalize()),
            HasherState::Sha256(h) => hex::encode(h.finalize()),
        };
        hex.truncate(FINGERPRINT_LEN);
        Fingerprint(hex)
    }
}

/// A short lowercase-hex fingerprint of some content.
///
/// The empty fingerprint is a sentinel for "could not be computed". It never
/// compares equal to a real fingerprint, so callers must check
/// [`Fingerprint::is_empty`] before trusting an equality.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an already computed hex string, e.g. one read from disk.
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Returns the sentinel fingerprint used when hashing failed.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Computes the fingerprint of a byte slice.
    pub fn from_bytes(algorithm: HashAlgorithm, data: &[u8]) -> Self {
        let mut hasher = algorithm.hasher();
        hasher.update(data);
        hasher.finish()
    }

    /// Returns `true` for the failure sentinel.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if both fingerprints are real and equal.
    pub fn matches(&self, other: &Fingerprint) -> bool {
        !self.is_empty() && self == other
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Fingerprint(<empty>)")
        } else {
            write!(f, "Fingerprint({})", self.0)
        }
    }
}
