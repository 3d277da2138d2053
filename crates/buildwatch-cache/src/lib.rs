//! SCons cache eviction.
//!
//! The SCons cache (`CacheDir`) is a tree of opaque files keyed by content
//! signature. SCons never evicts on its own, so after each successful build
//! the oldest files (by modification time) are removed until the tree fits
//! a byte budget.

mod budget;
mod prune;

pub use budget::{CacheBudget, CI_MAX_CACHE_BYTES, LOCAL_MAX_CACHE_BYTES};
pub use prune::{collect_entries, plan_evictions, CacheEntry, CachePruner, PruneResult};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to scan cache directory {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read metadata for {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
