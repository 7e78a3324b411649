/*!
 * Wait Table Shard Configuration
 *
 * CPU-aware shard count calculation for the indirect wait table.
 *
 * # Design Rationale
 *
 * - **Power-of-2 shards**: Enable fast modulo via bitwise AND (x & (n-1))
 * - **CPU-proportional scaling**: More cores = more concurrent waiters/notifiers
 */

use crate::core::limits::{MAX_TABLE_SHARDS, MIN_TABLE_SHARDS};

/// Buckets per CPU core; every blocking wait on an ineligible address passes
/// through the table
const SHARDS_PER_CPU: usize = 4;

/// Hardware-aware shard configuration (pure functions)
pub struct ShardManager;

impl ShardManager {
    /// Get CPU count
    #[inline]
    pub fn cpu_count() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or_else(|_| {
                tracing::warn!("Failed to detect CPU count, defaulting to 8");
                8
            })
    }

    /// Default wait table shard count for this machine
    #[inline]
    pub fn table_shards() -> usize {
        Self::shards_for_cpus(Self::cpu_count())
    }

    #[inline]
    fn shards_for_cpus(cpus: usize) -> usize {
        cpus.saturating_mul(SHARDS_PER_CPU)
            .next_power_of_two()
            .clamp(MIN_TABLE_SHARDS, MAX_TABLE_SHARDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shards_in_bounds() {
        let shards = ShardManager::table_shards();
        assert!(shards.is_power_of_two(), "Shards must be power of 2");
        assert!(shards >= MIN_TABLE_SHARDS);
        assert!(shards <= MAX_TABLE_SHARDS);
    }

    #[test]
    fn test_scales_with_cpus() {
        assert_eq!(ShardManager::shards_for_cpus(1), MIN_TABLE_SHARDS);
        assert_eq!(ShardManager::shards_for_cpus(6), 32);
        assert_eq!(ShardManager::shards_for_cpus(1 << 20), MAX_TABLE_SHARDS);
    }
}
