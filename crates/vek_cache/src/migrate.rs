//! Upgrades legacy `1.0.0` manifests.
//!
//! The legacy schema stored only `path -> hash`. Size and mtime are backfilled
//! from the filesystem and the old hash is kept as-is; it is trusted until a
//! metadata change forces a rehash. Paths that no longer exist are dropped.

use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use vek_common::Fingerprint;

use crate::manifest::{FileState, Manifest};

pub(crate) fn from_legacy(document: &Value) -> Manifest {
    let mut manifest = Manifest::new();
    let mut dropped = 0usize;

    let files = document
        .get("entries")
        .or_else(|| document.get("files"))
        .and_then(Value::as_object);

    for (path, hash) in files.into_iter().flatten() {
        let Some(hash) = hash.as_str() else {
            dropped += 1;
            continue;
        };
        let path = PathBuf::from(path);
        match fs::metadata(&path) {
            Ok(metadata) => {
                let state = FileState::observe(&metadata, Fingerprint::new(hash));
                manifest.entries.insert(path, state);
            }
            Err(_) => dropped += 1,
        }
    }

    tracing::info!(
        target: "vek::cache",
        migrated = manifest.len(),
        dropped,
        "migrated legacy cache manifest"
    );
    manifest.mark_dirty();
    manifest
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn backfills_metadata_and_keeps_hash() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.ts");
        fs::write(&file, "export {}").unwrap();

        let doc = serde_json::json!({
            "version": "1.0.0",
            "files": { file.to_string_lossy(): "deadbeef" }
        });
        let m = from_legacy(&doc);

        let entry = m.get(&file).unwrap();
        assert_eq!(entry.hash, Fingerprint::new("deadbeef"));
        assert_eq!(entry.size, 9);
        assert!(entry.mtime > 0.0);
        assert!(m.is_dirty());
    }

    #[test]
    fn drops_missing_paths_and_non_string_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("kept.ts");
        fs::write(&file, "x").unwrap();

        let doc = serde_json::json!({
            "formatVersion": "1.0.0",
            "entries": {
                file.to_string_lossy(): "cafebabe",
                "/definitely/not/here.ts": "deadbeef",
                dir.path().join("other.ts").to_string_lossy(): 42
            }
        });
        let m = from_legacy(&doc);
        assert_eq!(m.len(), 1);
        assert!(m.get(&file).is_some());
        assert!(m.get(Path::new("/definitely/not/here.ts")).is_none());
    }

    #[test]
    fn missing_file_map_yields_empty() {
        let m = from_legacy(&serde_json::json!({ "version": "1.0.0" }));
        assert!(m.is_empty());
    }

    #[test]
    fn loaded_through_manifest_parser() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.ts");
        fs::write(&file, "a").unwrap();
        let doc = serde_json::json!({
            "version": "1.0.0",
            "files": { file.to_string_lossy(): "deadbeef" }
        });

        let m = Manifest::from_json(&doc.to_string()).unwrap();
        assert_eq!(m.format_version, crate::CURRENT_FORMAT_VERSION);
        assert_eq!(m.get(&file).unwrap().hash.as_str(), "deadbeef");
    }
}
