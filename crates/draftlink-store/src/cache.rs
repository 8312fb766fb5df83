//! Registry cache: one pretty-printed JSON file per symbol.
//!
//! Files are named by the SHA-256 of the symbol so that slashes and dots in
//! symbols never reach the filesystem. Entries are written once through a
//! temp file and an atomic rename; unreadable or inconsistent entries are
//! logged and treated as absent, so the next successful fetch replaces them.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use draftlink_core::{RegistryRecord, normalize_symbol};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::StoreError;

/// Aggregate size of the cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
}

/// Hex SHA-256 of the trimmed symbol.
pub fn cache_key(symbol: &str) -> String {
    hex::encode(Sha256::digest(symbol.trim().as_bytes()))
}

/// Filesystem cache of [`RegistryRecord`]s.
///
/// The directory is created on the first write.
#[derive(Debug, Clone)]
pub struct RegistryCache {
    dir: PathBuf,
}

impl RegistryCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.json", cache_key(symbol)))
    }

    /// Read the cached record for `symbol`.
    ///
    /// Missing, unreadable, corrupt, or inconsistent entries all yield `None`.
    pub fn get(&self, symbol: &str) -> Option<RegistryRecord> {
        let path = self.path_for(symbol);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(symbol, path = %path.display(), error = %e, "failed to read cache entry");
                return None;
            }
        };

        let record: RegistryRecord = match serde_json::from_str(&text) {
            Ok(record) => record,
            Err(e) => {
                warn!(symbol, path = %path.display(), error = %e, "corrupt cache entry ignored");
                return None;
            }
        };

        if normalize_symbol(&record.symbol) != normalize_symbol(symbol) || !record.is_consistent()
        {
            warn!(symbol, path = %path.display(), "inconsistent cache entry ignored");
            return None;
        }

        debug!(symbol, "registry cache hit");
        Some(record)
    }

    /// Persist a record under its own symbol.
    pub fn put(&self, record: &RegistryRecord) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let path = self.path_for(&record.symbol);
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        serde_json::to_writer_pretty(&mut tmp, record)?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;

        debug!(symbol = %record.symbol, path = %path.display(), "registry cache entry written");
        Ok(())
    }

    /// Count and total size of the `*.json` entries.
    pub fn stats(&self) -> CacheStats {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return CacheStats::default(),
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "failed to list cache directory");
                return CacheStats::default();
            }
        };

        let mut stats = CacheStats::default();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if let Ok(meta) = entry.metadata()
                && meta.is_file()
            {
                stats.entries += 1;
                stats.total_bytes += meta.len();
            }
        }
        stats
    }
}
