/*!
 * Typed Helpers for Standard Atomics
 *
 * Safe wrappers over the raw facade for `std::sync::atomic` types. The atomic
 * reference guarantees the address is valid and that writers use atomic
 * stores, which is everything the raw `wait` asks of its caller.
 */

use super::context::WaitContext;
use super::traits::WakeResult;
use super::wait;
use crate::core::errors::{WaitError, WaitResult};
use std::sync::atomic::{
    AtomicBool, AtomicI16, AtomicI32, AtomicI64, AtomicI8, AtomicIsize, AtomicU16, AtomicU32,
    AtomicU64, AtomicU8, AtomicUsize, Ordering,
};
use std::time::Duration;

/// A standard atomic whose value can be waited on
pub trait AtomicWord: Sync + Sized {
    type Value: Copy + PartialEq;
    type Bytes: AsRef<[u8]>;

    fn load_value(&self) -> Self::Value;

    fn value_bytes(value: Self::Value) -> Self::Bytes;

    #[inline]
    fn as_addr(&self) -> *const () {
        self as *const Self as *const ()
    }
}

macro_rules! impl_atomic_word {
    ($($atomic:ty => $value:ty),+ $(,)?) => {
        $(
            impl AtomicWord for $atomic {
                type Value = $value;
                type Bytes = [u8; std::mem::size_of::<$value>()];

                #[inline]
                fn load_value(&self) -> $value {
                    self.load(Ordering::Acquire)
                }

                #[inline]
                fn value_bytes(value: $value) -> Self::Bytes {
                    value.to_ne_bytes()
                }
            }
        )+
    };
}

impl_atomic_word! {
    AtomicU8 => u8,
    AtomicI8 => i8,
    AtomicU16 => u16,
    AtomicI16 => i16,
    AtomicU32 => u32,
    AtomicI32 => i32,
    AtomicU64 => u64,
    AtomicI64 => i64,
    AtomicUsize => usize,
    AtomicIsize => isize,
}

impl AtomicWord for AtomicBool {
    type Value = bool;
    type Bytes = [u8; 1];

    #[inline]
    fn load_value(&self) -> bool {
        self.load(Ordering::Acquire)
    }

    #[inline]
    fn value_bytes(value: bool) -> [u8; 1] {
        [value as u8]
    }
}

/// One wait attempt on `atomic` while it holds `expected`
///
/// Same contract as the raw facade: `true` is advisory, `false` means the
/// context deadline passed.
#[inline]
pub fn wait_value<A: AtomicWord>(
    atomic: &A,
    expected: A::Value,
    ctx: &mut WaitContext,
    timeout: Option<Duration>,
) -> bool {
    let comparand = A::value_bytes(expected);
    // Safety: the reference keeps the atomic alive and all writes are atomic
    unsafe { wait::wait(atomic.as_addr(), comparand.as_ref(), ctx, timeout) }
}

/// Block until `atomic` no longer holds `expected`
///
/// Retries through spurious wakes with one deadline for the whole loop.
/// Returns the value observed to differ, or `WaitError::Timeout`.
pub fn wait_until_changed<A: AtomicWord>(
    atomic: &A,
    expected: A::Value,
    timeout: Option<Duration>,
) -> WaitResult<A::Value> {
    let mut ctx = WaitContext::new();
    loop {
        let current = atomic.load_value();
        if current != expected {
            return Ok(current);
        }
        if !wait_value(atomic, expected, &mut ctx, timeout) {
            let current = atomic.load_value();
            return if current != expected {
                Ok(current)
            } else {
                Err(WaitError::Timeout)
            };
        }
    }
}

/// Wake at least one thread waiting on `atomic`
#[inline]
pub fn notify_one_atomic<A: AtomicWord>(atomic: &A) -> WakeResult {
    wait::notify_one(atomic.as_addr())
}

/// Wake every thread waiting on `atomic`
#[inline]
pub fn notify_all_atomic<A: AtomicWord>(atomic: &A) -> WakeResult {
    wait::notify_all(atomic.as_addr())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_bool_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let waiter_flag = flag.clone();

        let handle = thread::spawn(move || {
            wait_until_changed(&*waiter_flag, false, Some(Duration::from_secs(5)))
        });

        thread::sleep(Duration::from_millis(30));
        flag.store(true, Ordering::Release);
        notify_all_atomic(&*flag);

        assert_eq!(handle.join().unwrap(), Ok(true));
    }

    #[test]
    fn test_signed_values() {
        let value = AtomicI16::new(-3);
        assert_eq!(
            wait_until_changed(&value, -2, Some(Duration::from_millis(10))),
            Ok(-3)
        );
    }

    #[test]
    fn test_timeout_error() {
        let value = AtomicU32::new(1);
        let start = Instant::now();

        let result = wait_until_changed(&value, 1, Some(Duration::from_millis(40)));

        assert_eq!(result, Err(WaitError::Timeout));
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn test_counter_sequence() {
        let counter = Arc::new(AtomicUsize::new(0));
        let waiter_counter = counter.clone();

        let handle = thread::spawn(move || {
            let mut seen = 0;
            while seen < 5 {
                seen = wait_until_changed(&*waiter_counter, seen, Some(Duration::from_secs(5)))
                    .expect("counter should advance");
            }
            seen
        });

        for _ in 0..5 {
            thread::sleep(Duration::from_millis(5));
            counter.fetch_add(1, Ordering::AcqRel);
            notify_one_atomic(&*counter);
        }

        assert_eq!(handle.join().unwrap(), 5);
    }
}
