/*!
 * Wait Engine Limits and Constants
 *
 * Centralized location for the tunables, thresholds, and magic numbers used
 * by the wait/notify engine. Configuration defaults are derived from these.
 *
 * ## Conventions
 * - Performance-critical constants are marked with [PERF]
 * - Values mirrored from OS interfaces are marked with [OS-COMPAT]
 */

use std::time::Duration;

// =============================================================================
// SPIN POLICY
// =============================================================================

/// Default spin iterations before blocking on a direct (native) wait
/// [PERF] Native wake latency is low, a short spin often catches the change
pub const DEFAULT_DIRECT_SPIN_COUNT: u32 = 100;

/// Default spin iterations before blocking on an indirect (table) wait
/// Zero: an indirect wait can only end after a notifier takes the slot lock
pub const DEFAULT_INDIRECT_SPIN_COUNT: u32 = 0;

/// Spin count used by the low-latency preset
pub const LOW_LATENCY_SPIN_COUNT: u32 = 1_000;

/// Spin count used by the long-wait preset
pub const LONG_WAIT_SPIN_COUNT: u32 = 10;

/// Upper bound accepted for any configured spin count
pub const MAX_SPIN_COUNT: u32 = 1 << 20;

/// Spin-loop hints issued before yielding while a capability probe is in flight
pub const DETECTION_SPINS_BEFORE_YIELD: u32 = 64;

// =============================================================================
// WAIT TABLE
// =============================================================================

/// Wait table shard count bounds (min/max)
/// [PERF] Auto-calculated from CPU count, clamped to this range, power of 2
pub const MIN_TABLE_SHARDS: usize = 8;
pub const MAX_TABLE_SHARDS: usize = 512;

/// Spin-loop hints per backoff round when a wait slot cannot be allocated
pub const SLOT_ALLOC_BACKOFF_SPINS: u32 = 32;

/// Striped address lock count (256 stripes)
/// [PERF] Must be power of 2 for fast modulo via bitmask
pub const LOCK_TABLE_STRIPES: usize = 256;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Longest single blocking call handed to the OS (10 days)
/// [OS-COMPAT] Keeps millisecond/timespec arguments far from overflow;
/// longer waits resume after a spurious wake
pub const MAX_SINGLE_WAIT: Duration = Duration::from_secs(10 * 24 * 60 * 60);
