//! Configuration types deserialized from `vek.toml`.

use serde::Deserialize;
use std::path::PathBuf;
use vek_common::HashAlgorithm;

/// Default cache directory, relative to the project root.
pub const DEFAULT_CACHE_DIR: &str = "node_modules/.vite-enhance/cache";

/// Default capacity bound on manifest entries.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// The top-level configuration parsed from `vek.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct VekConfig {
    /// Build cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Options handed to the build cache by the host build tool.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding `manifest.json`. Relative paths are resolved
    /// against the project root.
    #[serde(alias = "cache_directory")]
    pub cache_dir: PathBuf,
    /// Glob patterns selecting files subject to caching.
    pub include: Vec<String>,
    /// Glob patterns removing files from caching; checked before `include`.
    pub exclude: Vec<String>,
    /// Maximum number of manifest entries kept after eviction.
    #[serde(alias = "max_size")]
    pub max_entries: usize,
    /// Digest used for content fingerprints.
    pub hash_algorithm: HashAlgorithm,
    /// Project files whose change invalidates the whole cache
    /// (e.g. `package.json`), relative to the project root.
    pub invalidate_on: Vec<String>,
    /// Log every per-file hit and miss.
    pub verbose: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            include: to_strings(&[
                "**/*.ts", "**/*.tsx", "**/*.js", "**/*.jsx", "**/*.vue", "**/*.css", "**/*.scss",
            ]),
            exclude: to_strings(&[
                "**/node_modules/**",
                "**/dist/**",
                "**/.git/**",
                "**/coverage/**",
            ]),
            max_entries: DEFAULT_MAX_ENTRIES,
            hash_algorithm: HashAlgorithm::default(),
            invalidate_on: Vec::new(),
            verbose: false,
        }
    }
}

fn to_strings(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}
