//! Content fingerprinting with a per-build memo.
//!
//! Reading a whole file is the expensive step of a cache check, so each path
//! is hashed at most once per build while its size and mtime stay the same.
//! The memo must be reset between builds: in watch mode the same process sees
//! files change from one build to the next.

use std::collections::HashMap;
use std::fs::{File, Metadata};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use vek_common::{Fingerprint, HashAlgorithm};

use crate::error::CacheError;

/// Maximum number of paths remembered by the memo within one build.
pub const MEMO_CAPACITY: usize = 10_000;

const READ_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug)]
struct MemoEntry {
    hash: Fingerprint,
    size: u64,
    modified: Option<SystemTime>,
}

impl MemoEntry {
    fn observed(&self, metadata: &Metadata) -> bool {
        self.size == metadata.len() && self.modified == metadata.modified().ok()
    }
}

/// Computes file fingerprints, remembering results for the current build.
#[derive(Debug)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
    memo: HashMap<PathBuf, MemoEntry>,
    files_read: usize,
}

impl ContentHasher {
    /// Creates a hasher using the given digest algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            memo: HashMap::new(),
            files_read: 0,
        }
    }

    /// Returns the digest algorithm in use.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Returns the fingerprint of `path`, whose current metadata is
    /// `metadata`.
    ///
    /// The file is read only if it has not been hashed yet in this build, or
    /// if its size or mtime changed since it was. Failures are logged and
    /// yield [`Fingerprint::empty`], which never matches a stored
    /// fingerprint. Failures are not memoized.
    pub fn hash(&mut self, path: &Path, metadata: &Metadata) -> Fingerprint {
        if let Some(entry) = self.memo.get(path) {
            if entry.observed(metadata) {
                return entry.hash.clone();
            }
        }

        self.files_read += 1;
        match hash_file(self.algorithm, path) {
            Ok(hash) => {
                if self.memo.len() < MEMO_CAPACITY || self.memo.contains_key(path) {
                    let entry = MemoEntry {
                        hash: hash.clone(),
                        size: metadata.len(),
                        modified: metadata.modified().ok(),
                    };
                    self.memo.insert(path.to_path_buf(), entry);
                }
                hash
            }
            Err(err) => {
                self.memo.remove(path);
                tracing::warn!(target: "vek::cache", %err, "failed to hash file");
                Fingerprint::empty()
            }
        }
    }

    /// Forgets every memoized fingerprint. Called at the start of each build.
    pub fn reset(&mut self) {
        self.memo.clear();
    }

    /// Returns the number of memoized paths.
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Returns how many times a file was actually opened for hashing over
    /// the lifetime of this hasher.
    pub fn files_read(&self) -> usize {
        self.files_read
    }
}

/// Streams a file through the digest without consulting any memo.
pub fn hash_file(algorithm: HashAlgorithm, path: &Path) -> Result<Fingerprint, CacheError> {
    let mut file = File::open(path).map_err(|e| CacheError::io(path, e))?;
    let mut hasher = algorithm.hasher();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CacheError::io(path, e)),
        }
    }

    Ok(hasher.finish())
}
