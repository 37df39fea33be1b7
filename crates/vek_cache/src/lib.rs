//! Incremental build cache engine.
//!
//! Answers one question per source file during a build: is the state recorded
//! last time still valid? Cheap filesystem metadata is checked first and a
//! content fingerprint only when the metadata disagrees. The record of file
//! states is persisted as a versioned JSON manifest between builds and kept
//! bounded by an eviction pass.
//!
//! This is a validity oracle only: build outputs are never stored.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod eviction;
pub mod hasher;
pub mod manifest;
mod migrate;
pub mod pattern;
pub mod tracker;

pub use cache::{BuildCache, BuildSummary};
pub use error::CacheError;
pub use eviction::{EvictionPolicy, EvictionReport};
pub use hasher::ContentHasher;
pub use manifest::{FileState, Manifest, ManifestMetadata, CURRENT_FORMAT_VERSION, MANIFEST_FILE};
pub use pattern::{PatternCache, PatternMatcher, PatternRule};
pub use tracker::{CheckResult, FileStateTracker, Freshness};
