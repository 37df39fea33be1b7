//! Project root resolution and configuration loading shared by all commands.

use std::path::{Path, PathBuf};

use vek_cache::BuildCache;
use vek_config::{CacheConfig, VekConfig};

use crate::GlobalArgs;

/// Resolves the project root from `--root` or the current directory.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let root = match global.root {
        Some(ref root) => root.clone(),
        None => std::env::current_dir()?,
    };
    Ok(std::fs::canonicalize(root)?)
}

/// Loads the cache configuration for `root`.
///
/// An explicit `--config` file must exist. Otherwise `<root>/vek.toml` is
/// read if present and the defaults are used if not. Environment verbosity
/// and the `--verbose` flag are applied on top.
pub fn load_cache_config(
    root: &Path,
    global: &GlobalArgs,
) -> Result<CacheConfig, Box<dyn std::error::Error>> {
    let mut config: VekConfig = match global.config {
        Some(ref path) => vek_config::load_config_file(path)?,
        None => vek_config::load_config_or_default(root)?,
    };
    vek_config::apply_env_overrides(&mut config);
    if global.verbose {
        config.cache.verbose = true;
    }
    Ok(config.cache)
}

/// A resolved project root together with its effective cache configuration.
pub struct Project {
    /// Canonical project root.
    pub root: PathBuf,
    /// Configuration after environment and flag overrides.
    pub config: CacheConfig,
}

impl Project {
    /// Resolves the root and loads the configuration.
    pub fn load(global: &GlobalArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let root = resolve_project_root(global)?;
        let config = load_cache_config(&root, global)?;
        Ok(Self { root, config })
    }

    /// Opens the project's build cache.
    pub fn open_cache(&self) -> BuildCache {
        tracing::debug!(root = %self.root.display(), "opening build cache");
        BuildCache::open(self.config.clone(), &self.root)
    }
}
