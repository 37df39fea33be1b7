//! Bounds the manifest after each build.
//!
//! Two passes: entries for files that no longer exist are dropped, then the
//! oldest entries (by manifest insertion order) are dropped until the entry
//! count fits the configured maximum. Exceeding the cap only costs misses,
//! never incorrect hits, so insertion order stands in for recency.

use crate::manifest::Manifest;

/// Result of one eviction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Entries removed because their file no longer exists.
    pub stale_removed: usize,
    /// Entries removed to respect the capacity bound.
    pub over_capacity_removed: usize,
}

impl EvictionReport {
    /// Returns the total number of removed entries.
    pub fn total(&self) -> usize {
        self.stale_removed + self.over_capacity_removed
    }

    /// Returns `true` if nothing was removed.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Stale-entry and capacity eviction.
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    max_entries: usize,
}

impl EvictionPolicy {
    /// Creates a policy keeping at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries }
    }

    /// Returns the capacity bound.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Runs both passes and marks the manifest dirty if anything was removed.
    pub fn run(&self, manifest: &mut Manifest) -> EvictionReport {
        let stale_removed = self.remove_stale(manifest);
        let over_capacity_removed = self.enforce_capacity(manifest);
        EvictionReport {
            stale_removed,
            over_capacity_removed,
        }
    }

    /// Drops entries whose path no longer exists.
    pub fn remove_stale(&self, manifest: &mut Manifest) -> usize {
        let before = manifest.len();
        manifest.entries.retain(|path, _| path.exists());
        let removed = before - manifest.len();
        if removed > 0 {
            manifest.mark_dirty();
        }
        removed
    }

    /// Drops the oldest entries until the manifest fits the capacity bound.
    pub fn enforce_capacity(&self, manifest: &mut Manifest) -> usize {
        let excess = manifest.len().saturating_sub(self.max_entries);
        if excess > 0 {
            manifest.entries.drain(..excess);
            manifest.mark_dirty();
        }
        excess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::FileState;
    use std::fs;
    use std::path::PathBuf;
    use vek_common::Fingerprint;

    fn state() -> FileState {
        FileState {
            hash: Fingerprint::new("0123456789abcdef"),
            size: 1,
            mtime: 1.0,
        }
    }

    #[test]
    fn removes_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.ts");
        fs::write(&kept, "x").unwrap();

        let mut m = Manifest::new();
        m.insert(kept.clone(), state());
        m.insert(dir.path().join("gone.ts"), state());
        m.save(&dir.path().join("manifest.json")).unwrap();

        let report = EvictionPolicy::new(100).run(&mut m);
        assert_eq!(report.stale_removed, 1);
        assert_eq!(report.over_capacity_removed, 0);
        assert_eq!(m.len(), 1);
        assert!(m.get(&kept).is_some());
        assert!(m.is_dirty());
    }

    #[test]
    fn caps_entry_count_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = Manifest::new();
        let paths: Vec<PathBuf> = (0..5)
            .map(|i| {
                let p = dir.path().join(format!("f{i}.ts"));
                fs::write(&p, "x").unwrap();
                p
            })
            .collect();
        for p in &paths {
            m.insert(p.clone(), state());
        }

        let report = EvictionPolicy::new(3).run(&mut m);
        assert_eq!(report.over_capacity_removed, 2);
        assert_eq!(report.total(), 2);
        let keys: Vec<_> = m.entries().keys().cloned().collect();
        assert_eq!(keys, paths[2..].to_vec());
    }

    #[test]
    fn nothing_to_do_leaves_manifest_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let file = dir.path().join("a.ts");
        fs::write(&file, "x").unwrap();

        let mut m = Manifest::new();
        m.insert(file, state());
        m.save(&path).unwrap();

        let report = EvictionPolicy::new(10).run(&mut m);
        assert!(report.is_empty());
        assert!(!m.is_dirty());
    }

    #[test]
    fn stale_removal_runs_before_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = Manifest::new();
        m.insert(PathBuf::from("/nonexistent/a.ts"), state());
        m.insert(PathBuf::from("/nonexistent/b.ts"), state());
        let live = dir.path().join("c.ts");
        fs::write(&live, "x").unwrap();
        m.insert(live.clone(), state());

        let report = EvictionPolicy::new(1).run(&mut m);
        assert_eq!(report.stale_removed, 2);
        assert_eq!(report.over_capacity_removed, 0);
        assert!(m.get(&live).is_some());
    }
}
