/*!
 * Indirect Wait Engine (Wait Table)
 *
 * Fallback tier for addresses the OS cannot wait on directly: the wrong size,
 * the wrong alignment, or no native primitive at all.
 *
 * # Design: Sharded Table of Address-Keyed Slots
 *
 * The table is a fixed array of cache-line aligned buckets, each guarding a
 * map from address to `WaitSlot` with its own lock. A slot carries a
 * generation counter, a waiter count, and a private mutex + condvar:
 *
 * - **Subscribe** (bucket lock): find-or-create the slot, count the waiter,
 *   capture the generation into the context
 * - **Re-check** (no lock): the caller's predicate runs after subscribing, so
 *   a change that raced the subscription is seen before sleeping
 * - **Sleep** (slot lock): condvar wait while the generation is unchanged
 * - **Unsubscribe** (bucket lock): the last waiter removes the slot
 * - **Notify** (bucket lock, then slot lock): bump the generation, signal
 *
 * Table mutation and sleeping never share a lock scope, so a slow waiter never
 * stalls subscribe/notify traffic for other addresses. Addresses are opaque
 * keys here and are never dereferenced.
 */

use super::bytes;
use super::config;
use super::context::{WaitContext, WaitPhase};
use super::deadline;
use super::traits::{WaitEngine, WakeResult};
use crate::core::limits::{MAX_TABLE_SHARDS, MIN_TABLE_SHARDS, SLOT_ALLOC_BACKOFF_SPINS};
use crate::monitoring::stats;
use ahash::RandomState;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, TryReserveError};
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// One address currently being waited on
pub(crate) struct WaitSlot {
    address: usize,
    /// Bumped on every notify; only increases
    generation: AtomicU64,
    /// Subscribed waiters; modified only under the bucket lock
    waiter_count: AtomicUsize,
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl WaitSlot {
    fn new(address: usize) -> Self {
        Self {
            address,
            generation: AtomicU64::new(0),
            waiter_count: AtomicUsize::new(0),
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }
}

type SlotMap = HashMap<usize, Arc<WaitSlot>, RandomState>;

#[repr(C, align(64))] // Cache-line aligned to prevent false sharing
struct Bucket {
    slots: Mutex<SlotMap>,
}

impl Bucket {
    fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::with_hasher(RandomState::new())),
        }
    }
}

/// Sharded address -> slot table
pub struct WaitTable {
    buckets: Box<[Bucket]>,
    mask: usize,
    hasher: RandomState,
}

impl WaitTable {
    /// Create a table with `shards` buckets (rounded up to a power of two)
    pub fn new(shards: usize) -> Self {
        let shards = shards
            .next_power_of_two()
            .clamp(MIN_TABLE_SHARDS, MAX_TABLE_SHARDS);
        let buckets: Vec<Bucket> = (0..shards).map(|_| Bucket::new()).collect();

        Self {
            buckets: buckets.into_boxed_slice(),
            mask: shards - 1,
            hasher: RandomState::new(),
        }
    }

    #[inline]
    fn bucket(&self, key: usize) -> &Bucket {
        let mut hasher = self.hasher.build_hasher();
        key.hash(&mut hasher);
        &self.buckets[(hasher.finish() as usize) & self.mask]
    }

    fn subscribe(&self, key: usize, ctx: &mut WaitContext) -> Result<Arc<WaitSlot>, TryReserveError> {
        let mut slots = self.bucket(key).slots.lock();

        let slot = match slots.get(&key) {
            Some(slot) => slot.clone(),
            None => {
                slots.try_reserve(1)?;
                let slot = Arc::new(WaitSlot::new(key));
                slots.insert(key, slot.clone());
                tracing::trace!(address = key, "wait slot created");
                slot
            }
        };

        slot.waiter_count.fetch_add(1, Ordering::Relaxed);
        ctx.observed_generation = Some(slot.generation.load(Ordering::Acquire));
        ctx.phase = WaitPhase::BlockedCounter;
        Ok(slot)
    }

    fn unsubscribe(&self, slot: Arc<WaitSlot>, ctx: &mut WaitContext) {
        let mut slots = self.bucket(slot.address).slots.lock();
        if slot.waiter_count.fetch_sub(1, Ordering::Relaxed) == 1 {
            slots.remove(&slot.address);
            tracing::trace!(address = slot.address, "wait slot released");
        }
        drop(slots);
        ctx.phase = WaitPhase::BlockedNone;
        // Our Arc goes last, after every lock on the slot is released
    }

    /// Sleep until the slot generation moves past the observed one
    fn sleep(&self, slot: &WaitSlot, ctx: &mut WaitContext) -> bool {
        let observed = ctx.observed_generation.unwrap_or_default();
        let mut guard = slot.mutex.lock();
        ctx.phase = WaitPhase::BlockedLocked;

        let changed = loop {
            if slot.generation.load(Ordering::Acquire) != observed {
                break true;
            }
            match ctx.deadline.remaining(deadline::now()) {
                None => slot.condvar.wait(&mut guard),
                Some(left) if left == Duration::ZERO => break false,
                Some(left) => {
                    slot.condvar.wait_for(&mut guard, left);
                }
            }
        };

        drop(guard);
        ctx.phase = WaitPhase::BlockedCounter;
        changed
    }

    #[cold]
    fn back_off(&self, key: usize, err: TryReserveError) {
        tracing::warn!(address = key, error = %err, "wait slot allocation failed, backing off");
        stats().record_alloc_backoff();
        for _ in 0..SLOT_ALLOC_BACKOFF_SPINS {
            std::hint::spin_loop();
        }
        std::thread::yield_now();
    }

    /// Block on `key` while `still_equal` holds, until notified or timed out
    ///
    /// `still_equal` is evaluated after subscribing and before sleeping.
    /// Returns `false` only when the context deadline passed without a notify.
    pub fn wait_with(
        &self,
        key: usize,
        ctx: &mut WaitContext,
        mut still_equal: impl FnMut() -> bool,
    ) -> bool {
        let slot = match self.subscribe(key, ctx) {
            Ok(slot) => slot,
            Err(err) => {
                // Degrade to a spurious wake; the caller re-checks and retries
                self.back_off(key, err);
                return true;
            }
        };

        let changed = if still_equal() {
            self.sleep(&slot, ctx)
        } else {
            true
        };

        self.unsubscribe(slot, ctx);
        changed
    }

    fn notify(&self, key: usize, all: bool) -> WakeResult {
        let slot = match self.bucket(key).slots.lock().get(&key) {
            Some(slot) => slot.clone(),
            None => return WakeResult::NoWaiters,
        };

        let _guard = slot.mutex.lock();
        slot.generation.fetch_add(1, Ordering::Release);
        if all {
            match slot.condvar.notify_all() {
                0 => WakeResult::Delivered,
                n => WakeResult::Woken(n),
            }
        } else if slot.condvar.notify_one() {
            WakeResult::Woken(1)
        } else {
            WakeResult::Delivered
        }
    }

    /// Whether a live slot exists for `key`
    pub fn contains(&self, key: usize) -> bool {
        self.bucket(key).slots.lock().contains_key(&key)
    }

    /// Waiters currently subscribed to `key`
    pub fn waiter_count(&self, key: usize) -> usize {
        self.bucket(key)
            .slots
            .lock()
            .get(&key)
            .map_or(0, |slot| slot.waiter_count.load(Ordering::Relaxed))
    }

    /// Current generation of the slot for `key`, if one is live
    pub fn generation(&self, key: usize) -> Option<u64> {
        self.bucket(key)
            .slots
            .lock()
            .get(&key)
            .map(|slot| slot.generation.load(Ordering::Acquire))
    }

    /// Total live slots across all buckets
    pub fn slot_count(&self) -> usize {
        self.buckets.iter().map(|b| b.slots.lock().len()).sum()
    }

    pub fn shard_count(&self) -> usize {
        self.buckets.len()
    }
}

impl WaitEngine for WaitTable {
    unsafe fn wait(&self, addr: *const (), comparand: &[u8], ctx: &mut WaitContext) -> bool {
        self.wait_with(addr as usize, ctx, || bytes::equals(addr, comparand))
    }

    fn notify_one(&self, addr: *const ()) -> WakeResult {
        self.notify(addr as usize, false)
    }

    fn notify_all(&self, addr: *const ()) -> WakeResult {
        self.notify(addr as usize, true)
    }

    fn name(&self) -> &'static str {
        "wait_table"
    }
}

static TABLE: OnceLock<WaitTable> = OnceLock::new();

/// The process-wide wait table, created on first use
pub fn wait_table() -> &'static WaitTable {
    TABLE.get_or_init(|| {
        let shards = config::current().resolved_table_shards();
        tracing::debug!(shards, "wait table initialized");
        WaitTable::new(shards)
    })
}
