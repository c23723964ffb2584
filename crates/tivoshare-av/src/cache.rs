//! In-memory probe cache.
//!
//! Caches probe results per file so that repeated listings do not re-run
//! ffprobe. Reads are lock-free with respect to each other; a miss simply
//! falls through to an on-demand probe.

use crate::probe::VideoInfo;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Read-only view of whether a file has already been probed.
pub trait ProbeCache: Send + Sync {
    /// Whether a probe result for `path` is cached and still current.
    fn has_cached_probe(&self, path: &Path) -> bool;
}

struct CacheEntry {
    info: Arc<VideoInfo>,
    file_modified: Option<SystemTime>,
}

/// Thread-safe cache for probe results.
#[derive(Default)]
pub struct InfoCache {
    entries: DashMap<PathBuf, CacheEntry>,
}

impl InfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached probe for a file, if it is still current.
    pub fn get(&self, path: &Path) -> Option<Arc<VideoInfo>> {
        let current = modified_time(path);
        if let Some(entry) = self.entries.get(path) {
            if entry.file_modified == current {
                return Some(Arc::clone(&entry.info));
            }
        }
        self.evict_stale(path, current);
        None
    }

    /// Remove the entry for `path` unless it was taken at `current`.
    ///
    /// The check and the removal happen under the same shard lock, so an
    /// entry refreshed by another caller in between is kept.
    fn evict_stale(&self, path: &Path, current: Option<SystemTime>) {
        self.entries
            .remove_if(path, |_, entry| entry.file_modified != current);
    }

    /// Get a probe from cache or compute it.
    ///
    /// Concurrent callers missing on the same path may both run `compute`;
    /// the later insert wins and both results are equivalent.
    pub fn get_or_try_insert<F, E>(&self, path: &Path, compute: F) -> Result<Arc<VideoInfo>, E>
    where
        F: FnOnce(&Path) -> Result<VideoInfo, E>,
    {
        if let Some(info) = self.get(path) {
            return Ok(info);
        }

        let info = Arc::new(compute(path)?);
        self.insert(path, Arc::clone(&info));
        Ok(info)
    }

    /// Insert a probe result for `path`.
    pub fn insert(&self, path: &Path, info: Arc<VideoInfo>) {
        let entry = CacheEntry {
            info,
            file_modified: modified_time(path),
        };
        self.entries.insert(path.to_path_buf(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProbeCache for InfoCache {
    fn has_cached_probe(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
