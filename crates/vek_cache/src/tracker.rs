//! Per-file cache validity checks.
//!
//! A check escalates through three tiers: does the file exist, does its
//! size/mtime match the manifest, and only then does its content hash match.
//! Untouched files are therefore confirmed without reading them.

use std::fs;
use std::path::Path;

use crate::hasher::ContentHasher;
use crate::manifest::{FileState, Manifest};

/// How a file compares to its recorded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Not in the manifest before this check.
    New,
    /// Size and mtime match the manifest; the file was not read.
    Unchanged,
    /// Metadata changed but the content hash is the same.
    Touched,
    /// Content hash differs from the manifest.
    Modified,
    /// The file could not be stat'ed or read; its entry was removed.
    Missing,
}

impl Freshness {
    /// Returns `true` if previously computed work for the file can be reused.
    pub fn is_hit(self) -> bool {
        matches!(self, Freshness::Unchanged | Freshness::Touched)
    }
}

/// Outcome of a single file check.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    /// Classification of the file.
    pub freshness: Freshness,
    /// The state now recorded in the manifest, if any.
    pub state: Option<FileState>,
}

impl CheckResult {
    /// Returns `true` for a cache hit.
    pub fn hit(&self) -> bool {
        self.freshness.is_hit()
    }
}

/// Classifies files against the manifest, updating it as a side effect.
pub struct FileStateTracker;

impl FileStateTracker {
    /// Checks `path`, recording its current state in `manifest`.
    ///
    /// Never fails: anything that prevents observing the file removes its
    /// entry and reports a miss.
    pub fn check(path: &Path, manifest: &mut Manifest, hasher: &mut ContentHasher) -> CheckResult {
        let metadata = match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return Self::forget(path, manifest),
        };

        let (freshness, previous) = match manifest.get(path) {
            None => (Freshness::New, None),
            Some(stored) if stored.same_metadata(&metadata) => {
                return CheckResult {
                    freshness: Freshness::Unchanged,
                    state: Some(stored.clone()),
                };
            }
            Some(stored) => (Freshness::Modified, Some(stored.hash.clone())),
        };

        let hash = hasher.hash(path, &metadata);
        if hash.is_empty() {
            return Self::forget(path, manifest);
        }

        let freshness = match previous {
            Some(previous) if hash.matches(&previous) => Freshness::Touched,
            _ => freshness,
        };
        let state = FileState::observe(&metadata, hash);
        manifest.insert(path.to_path_buf(), state.clone());

        CheckResult {
            freshness,
            state: Some(state),
        }
    }

    fn forget(path: &Path, manifest: &mut Manifest) -> CheckResult {
        manifest.remove(path);
        CheckResult {
            freshness: Freshness::Missing,
            state: None,
        }
    }
}
