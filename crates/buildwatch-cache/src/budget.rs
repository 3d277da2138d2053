//! Cache size budgets.

use serde::{Deserialize, Serialize};

/// Budget used on CI machines, which build many configurations.
pub const CI_MAX_CACHE_BYTES: u64 = 4_000_000_000;

/// Budget used on developer machines and devices.
pub const LOCAL_MAX_CACHE_BYTES: u64 = 2_000_000_000;

/// Upper bound on the total size of the cache directory.
///
/// Pruning stops once the total is strictly below `max_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBudget {
    pub max_bytes: u64,
}

impl CacheBudget {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Default budget for a CI or interactive run.
    pub fn for_context(ci: bool) -> Self {
        if ci {
            Self::new(CI_MAX_CACHE_BYTES)
        } else {
            Self::new(LOCAL_MAX_CACHE_BYTES)
        }
    }

    /// Whether a cache of `total_bytes` still needs pruning.
    pub fn is_exceeded_by(&self, total_bytes: u64) -> bool {
        total_bytes >= self.max_bytes
    }
}
