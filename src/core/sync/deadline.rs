/*!
 * Deadline Arithmetic
 *
 * Converts relative timeouts into absolute monotonic deadlines, computed once
 * per logical wait so that retries never push the deadline out.
 *
 * Ticks are nanoseconds since a process-wide monotonic anchor captured on
 * first use.
 */

use crate::core::limits::MAX_SINGLE_WAIT;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Monotonic tick count (nanoseconds since the process anchor)
pub type Ticks = u64;

static ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Current monotonic tick count
#[inline]
pub fn now() -> Ticks {
    let anchor = *ANCHOR.get_or_init(Instant::now);
    duration_to_ticks(anchor.elapsed())
}

#[inline]
fn duration_to_ticks(d: Duration) -> Ticks {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Absolute point in monotonic time after which a wait gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Deadline(Ticks);

impl Deadline {
    /// Sentinel meaning "wait forever"
    pub const NEVER: Deadline = Deadline(u64::MAX);

    /// Latest finite deadline; saturated additions land here
    const LATEST: Ticks = u64::MAX - 1;

    /// Compute `now + timeout`, saturating instead of wrapping
    ///
    /// `None` yields [`Deadline::NEVER`]. A finite timeout never produces the
    /// sentinel, however large.
    #[inline]
    pub fn compute(now: Ticks, timeout: Option<Duration>) -> Deadline {
        match timeout {
            None => Deadline::NEVER,
            Some(timeout) => {
                let ticks = duration_to_ticks(timeout);
                Deadline(now.saturating_add(ticks).min(Self::LATEST))
            }
        }
    }

    /// Deadline relative to the current tick count
    #[inline]
    pub fn after(timeout: Option<Duration>) -> Deadline {
        Self::compute(now(), timeout)
    }

    #[inline]
    pub fn is_never(&self) -> bool {
        *self == Deadline::NEVER
    }

    #[inline]
    pub fn ticks(&self) -> Ticks {
        self.0
    }

    #[inline]
    pub fn has_passed(&self, now: Ticks) -> bool {
        !self.is_never() && now >= self.0
    }

    /// Time left for a single blocking call
    ///
    /// `None` means block without a timeout. Finite results are clamped to
    /// [`MAX_SINGLE_WAIT`]; `Some(Duration::ZERO)` means the deadline passed.
    #[inline]
    pub fn remaining(&self, now: Ticks) -> Option<Duration> {
        self.remaining_within(now, MAX_SINGLE_WAIT)
    }

    /// Time left for a single blocking call, clamped to `cap`
    #[inline]
    pub fn remaining_within(&self, now: Ticks, cap: Duration) -> Option<Duration> {
        if self.is_never() {
            return None;
        }
        let left = Duration::from_nanos(self.0.saturating_sub(now));
        Some(left.min(cap))
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Deadline::NEVER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_no_timeout_is_never() {
        let deadline = Deadline::compute(1234, None);
        assert!(deadline.is_never());
        assert_eq!(deadline.remaining(u64::MAX - 5), None);
        assert!(!deadline.has_passed(u64::MAX));
    }

    #[test]
    fn test_simple_addition() {
        let deadline = Deadline::compute(1_000, Some(Duration::from_nanos(500)));
        assert_eq!(deadline.ticks(), 1_500);
        assert!(!deadline.has_passed(1_499));
        assert!(deadline.has_passed(1_500));
    }

    #[test]
    fn test_saturates_without_becoming_sentinel() {
        let deadline = Deadline::compute(u64::MAX - 10, Some(Duration::from_secs(1)));
        assert_eq!(deadline.ticks(), u64::MAX - 1);
        assert!(!deadline.is_never());

        let huge = Deadline::compute(0, Some(Duration::MAX));
        assert!(!huge.is_never());
    }

    #[test]
    fn test_remaining_is_clamped() {
        let deadline = Deadline::compute(0, Some(Duration::from_secs(365 * 24 * 60 * 60)));
        assert_eq!(deadline.remaining(0), Some(MAX_SINGLE_WAIT));
    }

    #[test]
    fn test_remaining_within_custom_cap() {
        let deadline = Deadline::compute(0, Some(Duration::from_secs(2)));
        let cap = Duration::from_millis(100);
        assert_eq!(deadline.remaining_within(0, cap), Some(cap));
        assert_eq!(
            deadline.remaining_within(1_950_000_000, cap),
            Some(Duration::from_millis(50))
        );
        assert_eq!(Deadline::NEVER.remaining_within(0, cap), None);
    }

    #[test]
    fn test_remaining_after_expiry_is_zero() {
        let deadline = Deadline::compute(100, Some(Duration::from_nanos(10)));
        assert_eq!(deadline.remaining(500), Some(Duration::ZERO));
    }

    #[test]
    fn test_now_is_monotonic() {
        let a = now();
        std::thread::sleep(Duration::from_millis(1));
        let b = now();
        assert!(b > a);
    }

    proptest! {
        #[test]
        fn prop_deadline_never_before_now(now in any::<u64>(), nanos in any::<u64>()) {
            let deadline = Deadline::compute(now, Some(Duration::from_nanos(nanos)));
            prop_assert!(deadline.ticks() >= now.min(u64::MAX - 1));
            prop_assert!(!deadline.is_never());
        }

        #[test]
        fn prop_remaining_never_exceeds_timeout(now in 0u64..1 << 62, millis in 0u64..1 << 20) {
            let timeout = Duration::from_millis(millis);
            let deadline = Deadline::compute(now, Some(timeout));
            let left = deadline.remaining(now).unwrap();
            prop_assert!(left <= timeout);
            prop_assert!(left <= MAX_SINGLE_WAIT);
        }
    }
}
