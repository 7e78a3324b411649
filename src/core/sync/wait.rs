/*!
 * Wait/Notify Facade
 *
 * The single entry point for collaborators. Each call walks
 * `checking-value -> maybe-spin -> maybe-block -> returned`:
 *
 * 1. Compare the bytes at the address with the comparand; differ => `true`
 * 2. Ask the spin controller; spin => pause and re-compare
 * 3. Block once through the direct or indirect tier, return its verdict
 *
 * # Design: Enum Dispatch Over Tiers
 *
 * The tier is chosen per call from capability, size, and alignment, then
 * dispatched through a `match` instead of `dyn WaitEngine`, so the retry loop
 * and spin policy exist once and inline into both paths.
 */

use super::bytes;
use super::capability;
use super::config::{self, SyncConfig};
use super::context::{Tier, WaitContext};
use super::direct::{self, DirectEngine};
use super::indirect::{self, WaitTable};
use super::spin::SpinDecision;
use super::traits::{WaitEngine, WakeResult};
use crate::monitoring::stats;
use std::time::Duration;

/// Blocking tier implementation (enum dispatch)
enum EngineImpl {
    Direct(DirectEngine),
    Indirect(&'static WaitTable),
}

impl EngineImpl {
    #[inline(always)]
    fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Direct => Self::Direct(DirectEngine::new()),
            Tier::Indirect => Self::Indirect(indirect::wait_table()),
        }
    }

    #[inline(always)]
    unsafe fn wait(&self, addr: *const (), comparand: &[u8], ctx: &mut WaitContext) -> bool {
        match self {
            Self::Direct(engine) => {
                stats().record_direct_block();
                engine.wait(addr, comparand, ctx)
            }
            Self::Indirect(table) => {
                stats().record_indirect_block();
                table.wait(addr, comparand, ctx)
            }
        }
    }
}

#[inline]
fn select_tier(addr: *const (), size: usize, config: &SyncConfig) -> Tier {
    if direct::is_eligible(addr, size, config, capability::level()) {
        Tier::Direct
    } else {
        Tier::Indirect
    }
}

/// Tier a wait on `size` bytes at `addr` would block through
pub fn tier_for(addr: *const (), size: usize) -> Tier {
    select_tier(addr, size, config::current())
}

/// Wait until the bytes at `addr` differ from `comparand`
///
/// Returns `true` if the value was observed to differ or the blocking tier
/// reported a wake, `false` once the deadline passed. A `true` is advisory:
/// callers re-check the value they care about and call again with the same
/// context on a spurious wake.
///
/// The deadline is fixed from `timeout` on the first call with a fresh
/// context; later calls with that context keep the original deadline.
///
/// # Safety
///
/// `addr` must be valid for reads of `comparand.len()` bytes while the call
/// runs, and concurrent writers to that memory must use atomic stores.
/// `comparand` must not be empty.
pub unsafe fn wait(
    addr: *const (),
    comparand: &[u8],
    ctx: &mut WaitContext,
    timeout: Option<Duration>,
) -> bool {
    debug_assert!(!comparand.is_empty(), "waiting on a zero-sized value");
    ctx.start(timeout);

    if !bytes::equals(addr, comparand) {
        stats().record_immediate_return();
        return true;
    }

    let config = config::current();
    let tier = select_tier(addr, comparand.len(), config);

    while ctx.spin_step(config, tier) == SpinDecision::Spin {
        stats().record_spin();
        if !bytes::equals(addr, comparand) {
            return true;
        }
    }

    ctx.blocks += 1;
    let changed = EngineImpl::for_tier(tier).wait(addr, comparand, ctx);
    if !changed {
        stats().record_timeout();
    }
    changed
}

/// Wait on `key` while `still_equal` returns `true`
///
/// For values whose equality is not bytewise (padding, custom comparison).
/// Always blocks through the wait table; notifiers call [`notify_one`] or
/// [`notify_all`] with the same key.
pub fn wait_while(
    key: *const (),
    ctx: &mut WaitContext,
    timeout: Option<Duration>,
    mut still_equal: impl FnMut() -> bool,
) -> bool {
    ctx.start(timeout);

    if !still_equal() {
        stats().record_immediate_return();
        return true;
    }

    let config = config::current();
    while ctx.spin_step(config, Tier::Indirect) == SpinDecision::Spin {
        stats().record_spin();
        if !still_equal() {
            return true;
        }
    }

    ctx.blocks += 1;
    stats().record_indirect_block();
    let changed = indirect::wait_table().wait_with(key as usize, ctx, &mut still_equal);
    if !changed {
        stats().record_timeout();
    }
    changed
}

fn notify(addr: *const (), all: bool) -> WakeResult {
    stats().record_notify();

    let mut result = WakeResult::NoWaiters;
    if direct::may_have_waiters(addr, config::current(), capability::level()) {
        let engine = DirectEngine::new();
        result = if all {
            engine.notify_all(addr)
        } else {
            engine.notify_one(addr)
        };
    }

    // The bucket lock orders this notify against any concurrent subscribe
    let table = indirect::wait_table();
    let table_result = if all {
        table.notify_all(addr)
    } else {
        table.notify_one(addr)
    };
    result.merge(table_result)
}

/// Wake at least one thread waiting on `addr`
///
/// Never blocks beyond a short lock hold; a no-op without waiters.
#[inline]
pub fn notify_one(addr: *const ()) -> WakeResult {
    notify(addr, false)
}

/// Wake every thread waiting on `addr`
///
/// Never blocks beyond a short lock hold; a no-op without waiters.
#[inline]
pub fn notify_all(addr: *const ()) -> WakeResult {
    notify(addr, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::context::WaitPhase;
    use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn addr_of<T>(value: &T) -> *const () {
        value as *const T as *const ()
    }

    #[test]
    fn test_value_already_differs() {
        let word = AtomicU32::new(5);
        let mut ctx = WaitContext::new();

        let changed = unsafe { wait(addr_of(&word), &4u32.to_ne_bytes(), &mut ctx, None) };

        assert!(changed);
        assert_eq!(ctx.phase(), WaitPhase::Init);
        assert_eq!(ctx.blocks(), 0);
    }

    #[test]
    fn test_wait_u32_timeout() {
        let word = AtomicU32::new(0);
        let mut ctx = WaitContext::new();
        let start = Instant::now();

        let mut changed = true;
        // Advisory wakes may return early; a real loop keeps going
        while changed && word.load(Ordering::Acquire) == 0 {
            changed = unsafe {
                wait(addr_of(&word), &0u32.to_ne_bytes(), &mut ctx, Some(Duration::from_millis(50)))
            };
        }

        assert!(!changed);
        assert!(start.elapsed() >= Duration::from_millis(45));
        assert!(ctx.blocks() >= 1);
    }

    #[test]
    fn test_wait_u64_uses_table_and_wakes() {
        let value = Arc::new(AtomicU64::new(0));
        let waiter_value = value.clone();

        let handle = thread::spawn(move || {
            let mut ctx = WaitContext::new();
            while waiter_value.load(Ordering::Acquire) == 0 {
                let changed = unsafe {
                    wait(
                        addr_of(&*waiter_value),
                        &0u64.to_ne_bytes(),
                        &mut ctx,
                        Some(Duration::from_secs(5)),
                    )
                };
                assert!(changed);
            }
            waiter_value.load(Ordering::Acquire)
        });

        thread::sleep(Duration::from_millis(50));
        value.store(9, Ordering::Release);
        notify_one(addr_of(&*value));

        assert_eq!(handle.join().unwrap(), 9);
    }

    #[test]
    fn test_odd_size_region_is_indirect() {
        let region: [AtomicU8; 3] = Default::default();
        assert_eq!(tier_for(addr_of(&region), 3), Tier::Indirect);
    }

    #[test]
    fn test_wait_while_predicate() {
        let flag = Arc::new(AtomicU32::new(0));
        let key = 0xfeed_0000usize as *const ();
        let waiter_flag = flag.clone();

        let handle = thread::spawn(move || {
            let mut ctx = WaitContext::new();
            let key = 0xfeed_0000usize as *const ();
            while waiter_flag.load(Ordering::Acquire) < 3 {
                let changed = wait_while(key, &mut ctx, Some(Duration::from_secs(5)), || {
                    waiter_flag.load(Ordering::Acquire) < 3
                });
                assert!(changed);
            }
        });

        for i in 1..=3 {
            thread::sleep(Duration::from_millis(20));
            flag.store(i, Ordering::Release);
            notify_all(key);
        }

        handle.join().unwrap();
    }

    #[test]
    fn test_notify_without_waiters() {
        let word = AtomicU64::new(0);
        let result = notify_all(addr_of(&word));
        assert!(!matches!(result, WakeResult::Woken(_)));
        assert!(!indirect::wait_table().contains(addr_of(&word) as usize));
    }
}
