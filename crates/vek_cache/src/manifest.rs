//! Cache manifest that records the last known state of every tracked file.
//!
//! The manifest is stored as `manifest.json` in the cache directory. Each entry
//! pairs a content fingerprint with the size and modification time observed
//! when it was computed, so an unchanged file can be recognised from metadata
//! alone. Loading is fail-safe: a missing, corrupt, or unrecognisable file
//! yields an empty manifest and the build simply starts cold.

use std::fs::{self, Metadata};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vek_common::Fingerprint;

use crate::error::CacheError;
use crate::migrate;

/// Name of the manifest file within the cache directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Schema version written by this crate.
pub const CURRENT_FORMAT_VERSION: &str = "2.0.0";

/// Schema version whose entries are a flat path -> hash map.
pub(crate) const LEGACY_FORMAT_VERSION: &str = "1.0.0";

/// Identifies the writer in `metadata.toolVersion`.
pub const TOOL_VERSION: &str = concat!("vek_cache/", env!("CARGO_PKG_VERSION"));

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Last observed state of a single file.
///
/// `hash` is only trustworthy for the exact `size`/`mtime` pair stored with
/// it; a metadata change means the hash must be recomputed before reuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileState {
    /// Truncated content fingerprint.
    pub hash: Fingerprint,
    /// Length in bytes.
    pub size: u64,
    /// Modification time in milliseconds since the Unix epoch.
    pub mtime: f64,
}

impl FileState {
    /// Builds a state from freshly read metadata and a fingerprint.
    pub fn observe(metadata: &Metadata, hash: Fingerprint) -> Self {
        Self {
            hash,
            size: metadata.len(),
            mtime: mtime_millis(metadata),
        }
    }

    /// Returns `true` if `metadata` reports exactly the stored size and mtime.
    pub fn same_metadata(&self, metadata: &Metadata) -> bool {
        self.size == metadata.len() && self.mtime == mtime_millis(metadata)
    }
}

/// Returns the modification time of `metadata` in epoch milliseconds.
///
/// Platforms without mtime support report `0.0`.
pub fn mtime_millis(metadata: &Metadata) -> f64 {
    match metadata.modified() {
        Ok(time) => match time.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64() * 1000.0,
            Err(e) => -(e.duration().as_secs_f64() * 1000.0),
        },
        Err(_) => 0.0,
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Provenance of a manifest. Diagnostic only, never used for invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMetadata {
    /// When the manifest was first created, in epoch milliseconds.
    #[serde(default, alias = "created")]
    pub created_at: u64,
    /// When the manifest was last written, in epoch milliseconds.
    #[serde(default, alias = "lastModified")]
    pub last_modified_at: u64,
    /// Version of the tool that wrote the manifest.
    #[serde(default, alias = "nodeVersion")]
    pub tool_version: String,
}

impl ManifestMetadata {
    /// Creates metadata stamped with the current time and tool version.
    pub fn new() -> Self {
        let now = now_millis();
        Self {
            created_at: now,
            last_modified_at: now,
            tool_version: TOOL_VERSION.to_string(),
        }
    }
}

impl Default for ManifestMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Versioned record of tracked file states.
///
/// Entries keep their insertion order; updating an existing path does not
/// move it. Every mutation through this type sets a dirty flag, and the
/// owning build only writes the manifest back when that flag is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// On-disk schema version.
    #[serde(alias = "version")]
    pub format_version: String,

    /// Provenance information.
    #[serde(default)]
    pub metadata: ManifestMetadata,

    /// Per-file state keyed by absolute path.
    #[serde(alias = "files")]
    pub(crate) entries: IndexMap<PathBuf, FileState>,

    /// Combined fingerprint of the files that invalidate the whole cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) invalidation_key: Option<Fingerprint>,

    #[serde(skip)]
    dirty: bool,
}

impl Manifest {
    /// Creates a new, empty manifest in the current format.
    pub fn new() -> Self {
        Self {
            format_version: CURRENT_FORMAT_VERSION.to_string(),
            metadata: ManifestMetadata::new(),
            entries: IndexMap::new(),
            invalidation_key: None,
            dirty: false,
        }
    }

    /// Loads the manifest at `path`, falling back to an empty one.
    ///
    /// A missing file is the normal cold-start case. Unreadable or malformed
    /// files are logged and discarded; they cost a cold build, never a failed
    /// one.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(manifest)) => {
                tracing::info!(
                    target: "vek::cache",
                    path = %path.display(),
                    entries = manifest.len(),
                    "loaded cache manifest"
                );
                manifest
            }
            Ok(None) => Self::new(),
            Err(err) => {
                tracing::warn!(
                    target: "vek::cache",
                    %err,
                    "failed to load cache manifest, starting fresh"
                );
                Self::new()
            }
        }
    }

    /// Loads the manifest at `path`, returning `Ok(None)` if it does not exist.
    pub fn try_load(path: &Path) -> Result<Option<Self>, CacheError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, e)),
        };
        Self::from_json(&content).map(Some)
    }

    /// Parses a manifest document, migrating older schemas.
    ///
    /// Unknown versions are read as the current schema on a best-effort basis.
    pub fn from_json(content: &str) -> Result<Self, CacheError> {
        let document: Value = serde_json::from_str(content).map_err(parse_error)?;
        let version = document
            .get("formatVersion")
            .or_else(|| document.get("version"))
            .and_then(Value::as_str)
            .ok_or_else(|| CacheError::ManifestParse {
                reason: "missing format version".to_string(),
            })?
            .to_string();

        if version == LEGACY_FORMAT_VERSION {
            return Ok(migrate::from_legacy(&document));
        }
        if version != CURRENT_FORMAT_VERSION {
            tracing::warn!(
                target: "vek::cache",
                version = %version,
                "unknown cache manifest version, reading it as the current format"
            );
        }

        let mut manifest: Manifest = serde_json::from_value(document).map_err(parse_error)?;
        manifest.format_version = CURRENT_FORMAT_VERSION.to_string();
        Ok(manifest)
    }

    /// Writes the manifest to `path`, replacing any previous file atomically.
    ///
    /// Stamps `metadata.lastModifiedAt`, creates the parent directory if
    /// needed, and clears the dirty flag on success.
    pub fn save(&mut self, path: &Path) -> Result<(), CacheError> {
        self.metadata.last_modified_at = now_millis();
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        atomic_write(path, json.as_bytes())?;
        self.dirty = false;
        Ok(())
    }

    /// Deletes the manifest file at `path`. A missing file is not an error.
    pub fn remove_file(path: &Path) -> Result<(), CacheError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// Returns the state recorded for `path`.
    pub fn get(&self, path: &Path) -> Option<&FileState> {
        self.entries.get(path)
    }

    /// Records `state` for `path`, keeping the existing position if present.
    pub fn insert(&mut self, path: PathBuf, state: FileState) {
        self.entries.insert(path, state);
        self.dirty = true;
    }

    /// Removes the entry for `path`, preserving the order of the others.
    pub fn remove(&mut self, path: &Path) -> Option<FileState> {
        let removed = self.entries.shift_remove(path);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.dirty = true;
        }
    }

    /// Returns the entries in insertion order.
    pub fn entries(&self) -> &IndexMap<PathBuf, FileState> {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the stored whole-cache invalidation key.
    pub fn invalidation_key(&self) -> Option<&Fingerprint> {
        self.invalidation_key.as_ref()
    }

    /// Stores the whole-cache invalidation key.
    pub fn set_invalidation_key(&mut self, key: Fingerprint) {
        if self.invalidation_key.as_ref() != Some(&key) {
            self.invalidation_key = Some(key);
            self.dirty = true;
        }
    }

    /// Returns `true` if the manifest changed since it was loaded or saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forces the next save to happen.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_error(e: serde_json::Error) -> CacheError {
    CacheError::ManifestParse {
        reason: e.to_string(),
    }
}

/// Writes `bytes` to a unique sibling temp file and renames it over `path`.
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| MANIFEST_FILE.to_string());
    let tmp_path = parent.join(format!(
        ".{file_name}.{}.{}.tmp",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let written = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp_path, path));

    if let Err(e) = written {
        if let Err(remove_err) = fs::remove_file(&tmp_path) {
            if remove_err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    target: "vek::cache",
                    path = %tmp_path.display(),
                    error = %remove_err,
                    "failed to remove temporary manifest"
                );
            }
        }
        return Err(CacheError::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(hash: &str) -> FileState {
        FileState {
            hash: Fingerprint::new(hash),
            size: 12,
            mtime: 1_700_000_000_123.5,
        }
    }

    #[test]
    fn new_manifest_is_empty() {
        let m = Manifest::new();
        assert_eq!(m.format_version, CURRENT_FORMAT_VERSION);
        assert_eq!(m.metadata.tool_version, TOOL_VERSION);
        assert!(m.is_empty());
        assert!(!m.is_dirty());
        assert!(m.invalidation_key().is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        let mut m = Manifest::new();
        m.insert(PathBuf::from("/app/src/main.ts"), state("0123456789abcdef"));
        m.save(&path).unwrap();
        assert!(!m.is_dirty());

        let loaded = Manifest::load(&path);
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get(Path::new("/app/src/main.ts")),
            Some(&state("0123456789abcdef"))
        );
        assert_eq!(loaded.metadata.created_at, m.metadata.created_at);
        assert!(!loaded.is_dirty());
    }

    #[test]
    fn on_disk_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        let mut m = Manifest::new();
        m.insert(PathBuf::from("/a.ts"), state("0123456789abcdef"));
        m.save(&path).unwrap();

        let doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["formatVersion"], "2.0.0");
        assert!(doc["metadata"]["createdAt"].is_u64());
        assert!(doc["metadata"]["lastModifiedAt"].is_u64());
        assert_eq!(doc["metadata"]["toolVersion"], TOOL_VERSION);
        assert_eq!(doc["entries"]["/a.ts"]["hash"], "0123456789abcdef");
        assert_eq!(doc["entries"]["/a.ts"]["size"], 12);
        assert!(doc.get("invalidationKey").is_none());
    }

    #[test]
    fn entry_order_survives_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        let mut m = Manifest::new();
        for name in ["/z.ts", "/a.ts", "/m.ts"] {
            m.insert(PathBuf::from(name), state("0123456789abcdef"));
        }
        m.save(&path).unwrap();

        let loaded = Manifest::load(&path);
        let keys: Vec<_> = loaded.entries().keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                PathBuf::from("/z.ts"),
                PathBuf::from("/a.ts"),
                PathBuf::from("/m.ts")
            ]
        );
    }

    #[test]
    fn fractional_mtimes_reload_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        let mut m = Manifest::new();
        let mtimes: Vec<f64> = (0..200u64)
            .map(|i| {
                let nanos = ((i * 7_919_993 + 123_457) % 1_000_000_000) as u32;
                std::time::Duration::new(1_760_000_000 + i * 37, nanos).as_secs_f64() * 1000.0
            })
            .collect();
        for (i, mtime) in mtimes.iter().enumerate() {
            m.insert(
                PathBuf::from(format!("/src/f{i}.ts")),
                FileState {
                    hash: Fingerprint::new("0123456789abcdef"),
                    size: 1,
                    mtime: *mtime,
                },
            );
        }
        m.save(&path).unwrap();

        let loaded = Manifest::load(&path);
        for (i, mtime) in mtimes.iter().enumerate() {
            let stored = loaded.get(Path::new(&format!("/src/f{i}.ts"))).unwrap();
            assert_eq!(stored.mtime.to_bits(), mtime.to_bits(), "entry {i}");
        }
    }

    #[test]
    fn load_nonexistent_returns_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        assert!(Manifest::try_load(&path).unwrap().is_none());
        assert!(Manifest::load(&path).is_empty());
    }

    #[test]
    fn load_corrupt_json_returns_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Manifest::try_load(&path),
            Err(CacheError::ManifestParse { .. })
        ));
        assert!(Manifest::load(&path).is_empty());
    }

    #[test]
    fn load_wrong_shape_returns_fresh() {
        for doc in [
            r#"[1, 2, 3]"#,
            r#"{"entries": {}}"#,
            r#"{"formatVersion": "2.0.0", "entries": {"/a.ts": 5}}"#,
            r#"{"formatVersion": "2.0.0"}"#,
        ] {
            assert!(Manifest::from_json(doc).is_err(), "accepted {doc}");
        }
    }

    #[test]
    fn unknown_version_read_as_current() {
        let doc = r#"{
            "formatVersion": "9.9.9",
            "metadata": {"createdAt": 1, "lastModifiedAt": 2, "toolVersion": "future"},
            "entries": {"/a.ts": {"hash": "0123456789abcdef", "size": 1, "mtime": 5.0}},
            "somethingNew": true
        }"#;
        let m = Manifest::from_json(doc).unwrap();
        assert_eq!(m.format_version, CURRENT_FORMAT_VERSION);
        assert_eq!(m.len(), 1);
        assert_eq!(m.metadata.tool_version, "future");
    }

    #[test]
    fn reads_alternate_key_spellings() {
        let doc = r#"{
            "version": "2.0.0",
            "files": {"/a.ts": {"hash": "0123456789abcdef", "size": 3, "mtime": 1700000000000.25}},
            "metadata": {"created": 10, "lastModified": 20, "nodeVersion": "v20.11.0"}
        }"#;
        let m = Manifest::from_json(doc).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m.get(Path::new("/a.ts")).unwrap().mtime, 1_700_000_000_000.25);
        assert_eq!(m.metadata.created_at, 10);
        assert_eq!(m.metadata.last_modified_at, 20);
        assert_eq!(m.metadata.tool_version, "v20.11.0");
    }

    #[test]
    fn mutations_mark_dirty() {
        let mut m = Manifest::new();
        m.remove(Path::new("/missing.ts"));
        m.clear();
        assert!(!m.is_dirty());

        m.insert(PathBuf::from("/a.ts"), state("0123456789abcdef"));
        assert!(m.is_dirty());

        let dir = tempfile::tempdir().unwrap();
        m.save(&dir.path().join(MANIFEST_FILE)).unwrap();
        assert!(m.remove(Path::new("/a.ts")).is_some());
        assert!(m.is_dirty());
    }

    #[test]
    fn invalidation_key_only_dirty_on_change() {
        let mut m = Manifest::new();
        m.set_invalidation_key(Fingerprint::new("aaaaaaaaaaaaaaaa"));
        assert!(m.is_dirty());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        m.save(&path).unwrap();
        m.set_invalidation_key(Fingerprint::new("aaaaaaaaaaaaaaaa"));
        assert!(!m.is_dirty());

        let loaded = Manifest::load(&path);
        assert_eq!(
            loaded.invalidation_key(),
            Some(&Fingerprint::new("aaaaaaaaaaaaaaaa"))
        );
    }

    #[test]
    fn save_creates_directory_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("node_modules").join(".vek").join("cache");
        let path = nested.join(MANIFEST_FILE);
        let mut m = Manifest::new();
        m.save(&path).unwrap();
        m.save(&path).unwrap();

        let names: Vec<_> = fs::read_dir(&nested)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![MANIFEST_FILE.to_string()]);
    }

    #[test]
    fn save_updates_last_modified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        let mut m = Manifest::new();
        m.metadata.last_modified_at = 0;
        m.save(&path).unwrap();
        assert!(m.metadata.last_modified_at > 0);
    }

    #[test]
    fn save_failure_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();
        let mut m = Manifest::new();
        m.mark_dirty();
        let err = m.save(&blocker.join(MANIFEST_FILE)).unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
        assert!(m.is_dirty());
    }

    #[test]
    fn remove_file_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        Manifest::remove_file(&path).unwrap();
        fs::write(&path, "{}").unwrap();
        Manifest::remove_file(&path).unwrap();
        assert!(!path.exists());
    }
}
