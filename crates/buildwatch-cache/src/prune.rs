//! Oldest-first eviction down to a byte budget.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::{CacheBudget, CacheError, CacheResult};

/// A regular file in the cache tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: SystemTime,
}

/// Outcome of a pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneResult {
    /// Files found in the cache
    pub scanned: usize,
    /// Files deleted (or that would be, in dry-run mode)
    pub deleted: usize,
    /// Bytes freed by the deleted files
    pub bytes_reclaimed: u64,
    /// Total size left in the cache
    pub remaining_bytes: u64,
    /// Whether deletions were only reported
    pub dry_run: bool,
}

/// Collect every regular file under `dir`, oldest first.
///
/// Directories and symlinks are skipped. Directory entries are visited in
/// file-name order, so files with equal modification times keep a stable
/// relative order. A missing directory is an empty cache.
pub fn collect_entries(dir: &Path) -> CacheResult<Vec<CacheEntry>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| CacheError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            // Removed by a concurrent build between listing and stat.
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(source) => return Err(CacheError::Metadata { path, source }),
        };
        let modified = meta
            .modified()
            .map_err(|source| CacheError::Metadata {
                path: path.clone(),
                source,
            })?;

        entries.push(CacheEntry {
            path,
            size_bytes: meta.len(),
            modified,
        });
    }

    entries.sort_by_key(|e| e.modified);
    Ok(entries)
}

/// Number of leading (oldest) entries to delete to get under `budget`.
///
/// Deletion stops as soon as the running total drops below the budget, or
/// when every entry has been taken.
pub fn plan_evictions(entries: &[CacheEntry], budget: CacheBudget) -> usize {
    let mut total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    let mut count = 0;

    for entry in entries {
        if !budget.is_exceeded_by(total) {
            break;
        }
        total = total.saturating_sub(entry.size_bytes);
        count += 1;
    }

    count
}

/// Prunes a cache directory down to a budget.
#[derive(Debug, Clone)]
pub struct CachePruner {
    dir: PathBuf,
    budget: CacheBudget,
    dry_run: bool,
}

impl CachePruner {
    pub fn new(dir: impl Into<PathBuf>, budget: CacheBudget) -> Self {
        Self {
            dir: dir.into(),
            budget,
            dry_run: false,
        }
    }

    /// Report deletions without touching the filesystem.
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn budget(&self) -> CacheBudget {
        self.budget
    }

    /// Delete the oldest files until the cache is under budget.
    pub fn run(&self) -> CacheResult<PruneResult> {
        let entries = collect_entries(&self.dir)?;
        let mut remaining: u64 = entries.iter().map(|e| e.size_bytes).sum();
        let evict = plan_evictions(&entries, self.budget);

        let mut result = PruneResult {
            scanned: entries.len(),
            dry_run: self.dry_run,
            ..Default::default()
        };

        for entry in &entries[..evict] {
            if self.dry_run {
                tracing::info!(path = %entry.path.display(), bytes = entry.size_bytes, "would delete cache file");
            } else {
                match fs::remove_file(&entry.path) {
                    Ok(()) => {
                        tracing::debug!(path = %entry.path.display(), bytes = entry.size_bytes, "deleted cache file");
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        tracing::debug!(path = %entry.path.display(), "cache file already gone");
                    }
                    Err(source) => {
                        return Err(CacheError::Delete {
                            path: entry.path.clone(),
                            source,
                        });
                    }
                }
            }

            result.deleted += 1;
            result.bytes_reclaimed += entry.size_bytes;
            remaining = remaining.saturating_sub(entry.size_bytes);
        }

        result.remaining_bytes = remaining;

        tracing::info!(
            dir = %self.dir.display(),
            scanned = result.scanned,
            deleted = result.deleted,
            bytes_reclaimed = result.bytes_reclaimed,
            remaining_bytes = result.remaining_bytes,
            max_bytes = self.budget.max_bytes,
            dry_run = self.dry_run,
            "cache pruned"
        );

        Ok(result)
    }
}
