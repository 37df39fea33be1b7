//! Shared foundational types used across the Vek build cache crates.
//!
//! This crate provides the content fingerprint type and the set of digest
//! algorithms that can produce it.

#![warn(missing_docs)]

pub mod hash;

pub use hash::{Fingerprint, FingerprintHasher, HashAlgorithm, ParseHashAlgorithmError};
