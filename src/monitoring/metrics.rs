/*!
 * Wait Engine Metrics
 * Lock-free counters for the wait/notify paths
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide wait/notify counters
///
/// Relaxed increments only; a snapshot is approximate under concurrency.
#[derive(Debug)]
pub struct WaitStats {
    immediate_returns: AtomicU64,
    spins: AtomicU64,
    direct_blocks: AtomicU64,
    indirect_blocks: AtomicU64,
    timeouts: AtomicU64,
    notifies: AtomicU64,
    alloc_backoffs: AtomicU64,
}

/// Point-in-time copy of [`WaitStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub immediate_returns: u64,
    pub spins: u64,
    pub direct_blocks: u64,
    pub indirect_blocks: u64,
    pub timeouts: u64,
    pub notifies: u64,
    pub alloc_backoffs: u64,
}

impl WaitStats {
    pub const fn new() -> Self {
        Self {
            immediate_returns: AtomicU64::new(0),
            spins: AtomicU64::new(0),
            direct_blocks: AtomicU64::new(0),
            indirect_blocks: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            notifies: AtomicU64::new(0),
            alloc_backoffs: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_immediate_return(&self) {
        self.immediate_returns.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_spin(&self) {
        self.spins.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_direct_block(&self) {
        self.direct_blocks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_indirect_block(&self) {
        self.indirect_blocks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_notify(&self) {
        self.notifies.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_alloc_backoff(&self) {
        self.alloc_backoffs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            immediate_returns: self.immediate_returns.load(Ordering::Relaxed),
            spins: self.spins.load(Ordering::Relaxed),
            direct_blocks: self.direct_blocks.load(Ordering::Relaxed),
            indirect_blocks: self.indirect_blocks.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            notifies: self.notifies.load(Ordering::Relaxed),
            alloc_backoffs: self.alloc_backoffs.load(Ordering::Relaxed),
        }
    }
}

impl Default for WaitStats {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsSnapshot {
    /// Total blocking-tier calls
    pub fn blocks(&self) -> u64 {
        self.direct_blocks + self.indirect_blocks
    }

    /// JSON form for diagnostics endpoints and structured logs
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

static STATS: WaitStats = WaitStats::new();

/// Process-wide wait statistics
#[inline]
pub fn stats() -> &'static WaitStats {
    &STATS
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counters() {
        let stats = WaitStats::new();
        stats.record_spin();
        stats.record_spin();
        stats.record_direct_block();
        stats.record_indirect_block();
        stats.record_timeout();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.spins, 2);
        assert_eq!(snapshot.blocks(), 2);
        assert_eq!(snapshot.timeouts, 1);
        assert_eq!(snapshot.notifies, 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = WaitStats::new();
        stats.record_notify();
        let json = stats.snapshot().to_json();
        assert_eq!(json["notifies"], 1);
        assert_eq!(json["alloc_backoffs"], 0);
    }
}
