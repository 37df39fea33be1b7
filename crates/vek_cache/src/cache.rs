//! High-level build cache orchestrator.
//!
//! `BuildCache` ties together the manifest, pattern matcher, content hasher,
//! and eviction policy behind the lifecycle a build tool drives: open once at
//! configuration time, `begin_build`, one `check` per loaded module, then
//! `finish_build`. Every step is fail-safe; problems are logged and degrade to
//! cache misses.
//!
//! One `BuildCache` owns its manifest and memo exclusively. Several processes
//! sharing a cache directory are not coordinated: the last save wins.

use std::path::{Path, PathBuf};

use vek_common::Fingerprint;
use vek_config::CacheConfig;

use crate::error::CacheError;
use crate::eviction::{EvictionPolicy, EvictionReport};
use crate::hasher::ContentHasher;
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::pattern::PatternMatcher;
use crate::tracker::{CheckResult, FileStateTracker};

/// Counters describing one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Checks that reported a hit.
    pub hits: usize,
    /// Checks that reported a miss.
    pub misses: usize,
    /// Paths rejected by the include/exclude patterns.
    pub skipped: usize,
    /// Entries removed by eviction.
    pub evicted: EvictionReport,
    /// Entries left in the manifest.
    pub entries: usize,
    /// Whether the manifest was written to disk.
    pub saved: bool,
}

/// Incremental build cache for one project.
pub struct BuildCache {
    /// Project root; relative paths are resolved against it.
    root: PathBuf,

    /// Location of `manifest.json`.
    manifest_path: PathBuf,

    config: CacheConfig,
    manifest: Manifest,
    matcher: PatternMatcher,
    hasher: ContentHasher,
    eviction: EvictionPolicy,

    /// Counters for the build in progress.
    summary: BuildSummary,
}

impl BuildCache {
    /// Opens the cache described by `config` for the project at `root`.
    ///
    /// Loads the existing manifest if there is one. A missing or corrupt
    /// manifest results in an empty cache, never an error.
    pub fn open(config: CacheConfig, root: &Path) -> Self {
        let cache_dir = root.join(&config.cache_dir);
        let manifest_path = cache_dir.join(MANIFEST_FILE);

        tracing::debug!(
            target: "vek::cache",
            cache_dir = %cache_dir.display(),
            include = ?config.include,
            exclude = ?config.exclude,
            algorithm = %config.hash_algorithm,
            max_entries = config.max_entries,
            "build cache configured"
        );

        let manifest = Manifest::load(&manifest_path);
        let matcher = PatternMatcher::new(config.include.clone(), config.exclude.clone());
        let hasher = ContentHasher::new(config.hash_algorithm);
        let eviction = EvictionPolicy::new(config.max_entries);

        Self {
            root: root.to_path_buf(),
            manifest_path,
            config,
            manifest,
            matcher,
            hasher,
            eviction,
            summary: BuildSummary::default(),
        }
    }

    /// Starts a new build: clears the hash memo and per-build counters and
    /// applies whole-cache invalidation.
    pub fn begin_build(&mut self) {
        self.hasher.reset();
        self.summary = BuildSummary::default();
        self.apply_invalidation();

        tracing::info!(
            target: "vek::cache",
            entries = self.manifest.len(),
            "cache initialized"
        );
    }

    /// Checks whether the cached state of `path` is still valid.
    ///
    /// Returns `None` if the path is not subject to caching. Relative paths
    /// are resolved against the project root; patterns are matched against
    /// the root-relative form when the path lies under the root.
    pub fn check(&mut self, path: &Path) -> Option<CheckResult> {
        let path = self.root.join(path);
        let candidate = path.strip_prefix(&self.root).unwrap_or(&path);

        // Manifest keys are JSON strings.
        if path.to_str().is_none() {
            tracing::warn!(
                target: "vek::cache",
                path = %path.display(),
                "path is not valid UTF-8, not caching it"
            );
            self.summary.skipped += 1;
            return None;
        }

        if !self.matcher.should_cache(candidate) {
            self.summary.skipped += 1;
            return None;
        }

        let result = FileStateTracker::check(&path, &mut self.manifest, &mut self.hasher);
        if result.hit() {
            self.summary.hits += 1;
        } else {
            self.summary.misses += 1;
        }

        if self.config.verbose {
            let path = path.display();
            if result.hit() {
                tracing::debug!(target: "vek::cache", %path, freshness = ?result.freshness, "cache hit");
            } else {
                tracing::debug!(target: "vek::cache", %path, freshness = ?result.freshness, "cache miss");
            }
        }

        Some(result)
    }

    /// Ends the build: evicts, persists if anything changed, and drops the
    /// hash memo.
    pub fn finish_build(&mut self) -> BuildSummary {
        self.summary.evicted = self.evict();
        self.summary.saved = self.persist();
        self.summary.entries = self.manifest.len();
        self.hasher.reset();

        tracing::info!(
            target: "vek::cache",
            hits = self.summary.hits,
            misses = self.summary.misses,
            skipped = self.summary.skipped,
            entries = self.summary.entries,
            saved = self.summary.saved,
            "build cache summary"
        );
        self.summary
    }

    /// Runs eviction outside a build and saves the result.
    pub fn prune(&mut self) -> EvictionReport {
        let report = self.evict();
        self.persist();
        report
    }

    /// Drops every entry and deletes the manifest file.
    pub fn clear(&mut self) -> Result<(), CacheError> {
        self.manifest = Manifest::new();
        Manifest::remove_file(&self.manifest_path)
    }

    /// Returns the in-memory manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Returns the location of `manifest.json`.
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Returns the configuration this cache was opened with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the content hasher.
    pub fn hasher(&self) -> &ContentHasher {
        &self.hasher
    }

    fn evict(&mut self) -> EvictionReport {
        let report = self.eviction.run(&mut self.manifest);
        if !report.is_empty() {
            tracing::info!(
                target: "vek::cache",
                stale = report.stale_removed,
                over_capacity = report.over_capacity_removed,
                "cleaned up cache entries"
            );
        }
        report
    }

    /// Saves the manifest if dirty. Write failures are logged, not returned.
    fn persist(&mut self) -> bool {
        if !self.manifest.is_dirty() {
            return false;
        }
        match self.manifest.save(&self.manifest_path) {
            Ok(()) => {
                tracing::info!(
                    target: "vek::cache",
                    path = %self.manifest_path.display(),
                    entries = self.manifest.len(),
                    "cache manifest updated"
                );
                true
            }
            Err(err) => {
                tracing::error!(target: "vek::cache", %err, "failed to save cache manifest");
                false
            }
        }
    }

    /// Clears all entries if any `invalidate_on` file changed since the key
    /// was last recorded.
    fn apply_invalidation(&mut self) {
        if self.config.invalidate_on.is_empty() {
            return;
        }
        let key = self.invalidation_key();
        let changed = self
            .manifest
            .invalidation_key()
            .is_some_and(|stored| *stored != key);

        if changed {
            tracing::info!(
                target: "vek::cache",
                dropped = self.manifest.len(),
                "project files changed, invalidating build cache"
            );
            self.manifest.clear();
        }
        self.manifest.set_invalidation_key(key);
    }

    /// Combined fingerprint of the `invalidate_on` files. A missing file
    /// contributes an empty fingerprint, so creating or deleting one also
    /// changes the key.
    fn invalidation_key(&mut self) -> Fingerprint {
        let mut combined = self.config.hash_algorithm.hasher();
        for file in &self.config.invalidate_on {
            let path = self.root.join(file);
            let hash = match std::fs::metadata(&path) {
                Ok(metadata) if metadata.is_file() => self.hasher.hash(&path, &metadata),
                _ => Fingerprint::empty(),
            };
            combined.update(file.as_bytes());
            combined.update(b"\0");
            combined.update(hash.as_str().as_bytes());
            combined.update(b"\n");
        }
        combined.finish()
    }
}
