/*!
 * Engine Traits
 *
 * Both blocking tiers sit behind the same narrow interface so the facade's
 * retry loop and spin controller are written once.
 *
 * # Design: Trait at the Seam, Enum Dispatch at the Call Site
 *
 * The facade picks a tier per call and dispatches through a `match`, keeping
 * the hot path free of vtables; the trait fixes the contract and lets tests
 * drive either engine on its own.
 */

use super::context::WaitContext;

/// Result of a wake operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Woke N waiters (N >= 1)
    Woken(usize),
    /// No waiters were waiting
    NoWaiters,
    /// Wake issued; the platform does not report how many threads it reached
    Delivered,
}

impl WakeResult {
    /// Check if any waiters may have been woken
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        !matches!(self, WakeResult::NoWaiters)
    }

    /// Get number of woken waiters (0 if none or unknown)
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters | WakeResult::Delivered => 0,
        }
    }

    /// Combine results from both tiers for the same address
    #[inline]
    pub fn merge(self, other: WakeResult) -> WakeResult {
        match (self, other) {
            (WakeResult::Woken(a), WakeResult::Woken(b)) => WakeResult::Woken(a + b),
            (WakeResult::NoWaiters, r) | (r, WakeResult::NoWaiters) => r,
            (WakeResult::Woken(n), WakeResult::Delivered)
            | (WakeResult::Delivered, WakeResult::Woken(n)) => WakeResult::Woken(n),
            (WakeResult::Delivered, WakeResult::Delivered) => WakeResult::Delivered,
        }
    }
}

/// A blocking tier of the wait engine
///
/// Implementations must be:
/// - **Thread-safe**: any thread may wait or notify concurrently
/// - **Lossless**: a notify after a value change reaches a waiter that has
///   entered its blocking step
/// - **Non-blocking on notify**: at most a short bounded lock hold
pub trait WaitEngine: Send + Sync {
    /// Block while the bytes at `addr` equal `comparand`, until notified or
    /// the context deadline passes
    ///
    /// Returns `false` on timeout. `true` is advisory: the caller re-compares.
    ///
    /// # Safety
    ///
    /// `addr` must be valid for atomic reads of `comparand.len()` bytes for the
    /// duration of the call.
    unsafe fn wait(&self, addr: *const (), comparand: &[u8], ctx: &mut WaitContext) -> bool;

    /// Wake at least one waiter blocked on `addr`, if any
    fn notify_one(&self, addr: *const ()) -> WakeResult;

    /// Wake every waiter blocked on `addr`
    fn notify_all(&self, addr: *const ()) -> WakeResult;

    /// Get engine name for debugging
    fn name(&self) -> &'static str;
}
