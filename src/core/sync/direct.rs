/*!
 * Direct Wait Engine
 *
 * Blocks a thread on a memory address through the OS primitive, with no
 * auxiliary table:
 * - Linux/Android: `futex(2)` with `FUTEX_PRIVATE_FLAG` (4-byte values)
 * - Windows: `WaitOnAddress` / `WakeByAddress*` (1, 2, 4 and 8-byte values)
 * - Elsewhere: unavailable; the capability probe reports `Basic`
 *
 * The kernel compares the value and sleeps atomically, so a wake issued after
 * the value changed is never lost.
 */

use super::capability::CapabilityLevel;
use super::config::SyncConfig;
use super::context::WaitContext;
use super::deadline;
use super::traits::{WaitEngine, WakeResult};
use crate::core::limits::MAX_SINGLE_WAIT;
use std::time::Duration;

/// Native address-wait engine
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectEngine;

impl DirectEngine {
    pub const fn new() -> Self {
        Self
    }
}

/// Whether a wait on `size` bytes at `addr` can use the direct tier
#[inline]
pub fn is_eligible(addr: *const (), size: usize, config: &SyncConfig, level: CapabilityLevel) -> bool {
    level == CapabilityLevel::Fast
        && config.is_direct_size(size)
        && (addr as usize) % size == 0
}

/// Whether any direct waiter could be parked at `addr`
#[inline]
pub fn may_have_waiters(addr: *const (), config: &SyncConfig, level: CapabilityLevel) -> bool {
    level == CapabilityLevel::Fast
        && config
            .direct_sizes
            .iter()
            .any(|&size| (addr as usize) % size == 0)
}

/// Bounded, side-effect-free check that the native primitive works
pub fn probe() -> bool {
    sys::probe()
}

impl DirectEngine {
    /// One OS wait of at most `cap`
    ///
    /// The OS timing out a slice shorter than the context deadline is reported
    /// as a spurious wake; `false` only once the deadline itself has passed.
    pub(crate) unsafe fn wait_within(
        &self,
        addr: *const (),
        comparand: &[u8],
        ctx: &mut WaitContext,
        cap: Duration,
    ) -> bool {
        let remaining = ctx.deadline.remaining_within(deadline::now(), cap);
        if remaining == Some(Duration::ZERO) {
            return false;
        }
        if sys::wait(addr, comparand, remaining) {
            return true;
        }
        !ctx.deadline.has_passed(deadline::now())
    }
}

impl WaitEngine for DirectEngine {
    unsafe fn wait(&self, addr: *const (), comparand: &[u8], ctx: &mut WaitContext) -> bool {
        self.wait_within(addr, comparand, ctx, MAX_SINGLE_WAIT)
    }

    fn notify_one(&self, addr: *const ()) -> WakeResult {
        sys::wake(addr, false)
    }

    fn notify_all(&self, addr: *const ()) -> WakeResult {
        sys::wake(addr, true)
    }

    fn name(&self) -> &'static str {
        sys::NAME
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
mod sys {
    use super::WakeResult;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    pub const NAME: &str = "futex";

    const WAIT_OP: libc::c_int = libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG;
    const WAKE_OP: libc::c_int = libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG;

    pub fn probe() -> bool {
        let word = AtomicU32::new(0);
        // Waking zero waiters on a private word has no observable effect
        let rc = unsafe { libc::syscall(libc::SYS_futex, word.as_ptr(), WAKE_OP, 0) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            tracing::debug!(error = %err, "futex unavailable");
            return false;
        }
        true
    }

    pub unsafe fn wait(addr: *const (), comparand: &[u8], timeout: Option<Duration>) -> bool {
        let Ok(raw) = <[u8; 4]>::try_from(comparand) else {
            return true;
        };
        let expected = u32::from_ne_bytes(raw);

        let timespec = timeout.map(|d| libc::timespec {
            tv_sec: d.as_secs() as libc::time_t,
            tv_nsec: d.subsec_nanos() as _,
        });
        let timespec_ptr = timespec
            .as_ref()
            .map_or(std::ptr::null(), |ts| ts as *const libc::timespec);

        let rc = libc::syscall(
            libc::SYS_futex,
            addr as *const u32,
            WAIT_OP,
            expected,
            timespec_ptr,
        );
        if rc == 0 {
            return true;
        }

        // EAGAIN: value already differed. EINTR: spurious. Both re-check.
        std::io::Error::last_os_error().raw_os_error() != Some(libc::ETIMEDOUT)
    }

    pub fn wake(addr: *const (), all: bool) -> WakeResult {
        let count: libc::c_int = if all { libc::c_int::MAX } else { 1 };
        let rc = unsafe { libc::syscall(libc::SYS_futex, addr as *const u32, WAKE_OP, count) };
        match rc {
            n if n > 0 => WakeResult::Woken(n as usize),
            _ => WakeResult::NoWaiters,
        }
    }
}

#[cfg(windows)]
mod sys {
    use super::WakeResult;
    use std::ffi::c_void;
    use std::time::Duration;
    use windows_sys::Win32::Foundation::{GetLastError, ERROR_TIMEOUT};
    use windows_sys::Win32::System::Threading::{
        WaitOnAddress, WakeByAddressAll, WakeByAddressSingle, INFINITE,
    };

    pub const NAME: &str = "wait_on_address";

    pub fn probe() -> bool {
        // Resolved at link time from the synchronization API set
        true
    }

    pub unsafe fn wait(addr: *const (), comparand: &[u8], timeout: Option<Duration>) -> bool {
        let millis = match timeout {
            None => INFINITE,
            // Round up so a sub-millisecond remainder does not time out early
            Some(d) => u32::try_from(d.as_nanos().div_ceil(1_000_000))
                .unwrap_or(INFINITE - 1)
                .min(INFINITE - 1),
        };

        let ok = WaitOnAddress(
            addr as *const c_void,
            comparand.as_ptr() as *const c_void,
            comparand.len(),
            millis,
        );
        if ok != 0 {
            return true;
        }
        GetLastError() != ERROR_TIMEOUT
    }

    pub fn wake(addr: *const (), all: bool) -> WakeResult {
        unsafe {
            if all {
                WakeByAddressAll(addr as *const c_void);
            } else {
                WakeByAddressSingle(addr as *const c_void);
            }
        }
        WakeResult::Delivered
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android", windows)))]
mod sys {
    use super::WakeResult;
    use std::time::Duration;

    pub const NAME: &str = "unavailable";

    pub fn probe() -> bool {
        false
    }

    pub unsafe fn wait(_addr: *const (), _comparand: &[u8], _timeout: Option<Duration>) -> bool {
        // Never selected: capability resolves to Basic here
        true
    }

    pub fn wake(_addr: *const (), _all: bool) -> WakeResult {
        WakeResult::NoWaiters
    }
}

#[cfg(all(test, any(target_os = "linux", target_os = "android", windows)))]
mod tests {
    use super::*;
    use crate::core::sync::deadline::Deadline;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn addr_of(word: &AtomicU32) -> *const () {
        word as *const AtomicU32 as *const ()
    }

    #[test]
    fn test_probe_succeeds() {
        assert!(probe());
    }

    #[test]
    fn test_eligibility() {
        let config = SyncConfig::default();
        let word = AtomicU32::new(0);
        assert!(is_eligible(addr_of(&word), 4, &config, CapabilityLevel::Fast));
        assert!(!is_eligible(addr_of(&word), 4, &config, CapabilityLevel::Basic));
        assert!(!is_eligible(addr_of(&word), 3, &config, CapabilityLevel::Fast));

        let portable = SyncConfig::portable();
        assert!(!is_eligible(addr_of(&word), 4, &portable, CapabilityLevel::Fast));
    }

    #[test]
    fn test_direct_timeout() {
        let word = AtomicU32::new(0);
        let mut ctx = WaitContext::with_deadline(Deadline::after(Some(Duration::from_millis(50))));
        let start = Instant::now();

        let changed = unsafe { DirectEngine.wait(addr_of(&word), &0u32.to_ne_bytes(), &mut ctx) };

        assert!(!changed);
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn test_capped_slice_timeout_is_not_deadline() {
        let word = AtomicU32::new(0);
        let mut ctx = WaitContext::with_deadline(Deadline::after(Some(Duration::from_millis(200))));
        let cap = Duration::from_millis(20);
        let start = Instant::now();

        let first = unsafe { DirectEngine.wait_within(addr_of(&word), &0u32.to_ne_bytes(), &mut ctx, cap) };
        assert!(first, "slice timeout before the deadline must read as a spurious wake");

        let mut slices = 1;
        while unsafe { DirectEngine.wait_within(addr_of(&word), &0u32.to_ne_bytes(), &mut ctx, cap) } {
            slices += 1;
            assert!(start.elapsed() < Duration::from_secs(5), "deadline never reported");
        }

        assert!(start.elapsed() >= Duration::from_millis(195));
        assert!(slices >= 2);
    }

    #[test]
    fn test_direct_value_mismatch_returns_immediately() {
        let word = AtomicU32::new(1);
        let mut ctx = WaitContext::new();
        let changed = unsafe { DirectEngine.wait(addr_of(&word), &0u32.to_ne_bytes(), &mut ctx) };
        assert!(changed);
    }

    #[test]
    fn test_direct_wake_one() {
        let word = Arc::new(AtomicU32::new(0));
        let waiter_word = word.clone();

        let handle = thread::spawn(move || {
            let mut ctx = WaitContext::with_deadline(Deadline::after(Some(Duration::from_secs(5))));
            let start = Instant::now();
            while waiter_word.load(Ordering::Acquire) == 0 {
                let changed = unsafe {
                    DirectEngine.wait(addr_of(&waiter_word), &0u32.to_ne_bytes(), &mut ctx)
                };
                assert!(changed, "should be woken before the deadline");
            }
            start.elapsed()
        });

        thread::sleep(Duration::from_millis(50));
        word.store(1, Ordering::Release);
        DirectEngine.notify_one(addr_of(&word));

        let elapsed = handle.join().unwrap();
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_notify_without_waiters() {
        let word = AtomicU32::new(0);
        assert!(!matches!(
            DirectEngine.notify_all(addr_of(&word)),
            WakeResult::Woken(_)
        ));
    }
}
