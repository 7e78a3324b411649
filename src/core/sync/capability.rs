/*!
 * Capability Detection
 *
 * Lazily resolves, once per process, whether a native address-wait primitive
 * is usable. Resolution is a CAS-guarded state machine:
 *
 * `Unresolved -> Detecting -> {Basic | Fast}`
 *
 * The CAS winner runs the probe and publishes the result with a release
 * store. Everyone else reads; losers that arrive mid-probe spin (then yield)
 * until the value is terminal. Once terminal it never changes.
 */

use super::config::{self, CapabilityPreference};
use super::direct;
use crate::core::limits::DETECTION_SPINS_BEFORE_YIELD;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Which OS-level wait primitive is usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CapabilityLevel {
    Unresolved = 0,
    Detecting = 1,
    /// Only mutex/condvar waiting; every blocking wait uses the wait table
    Basic = 2,
    /// Native address wait available for eligible sizes
    Fast = 3,
}

impl CapabilityLevel {
    #[inline]
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Unresolved,
            1 => Self::Detecting,
            2 => Self::Basic,
            _ => Self::Fast,
        }
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Basic | Self::Fast)
    }
}

/// Single-writer, many-reader lazy capability cell
pub struct CapabilityDetector {
    state: AtomicU8,
}

impl CapabilityDetector {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(CapabilityLevel::Unresolved as u8),
        }
    }

    /// Current value without triggering detection
    #[inline]
    pub fn peek(&self) -> CapabilityLevel {
        CapabilityLevel::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Resolve using `probe`, which reports whether the native primitive works
    ///
    /// `probe` runs at most once per detector, on the CAS-winning thread.
    pub fn get_or_detect_with(&self, probe: impl FnOnce() -> bool) -> CapabilityLevel {
        let current = self.peek();
        if current.is_terminal() {
            return current;
        }

        if current == CapabilityLevel::Unresolved
            && self
                .state
                .compare_exchange(
                    CapabilityLevel::Unresolved as u8,
                    CapabilityLevel::Detecting as u8,
                    Ordering::Acquire,
                    Ordering::Acquire,
                )
                .is_ok()
        {
            let level = if probe() {
                CapabilityLevel::Fast
            } else {
                CapabilityLevel::Basic
            };
            self.state.store(level as u8, Ordering::Release);
            tracing::debug!(?level, "wait capability resolved");
            return level;
        }

        self.await_terminal()
    }

    #[cold]
    fn await_terminal(&self) -> CapabilityLevel {
        let mut spins = 0u32;
        loop {
            let level = self.peek();
            if level.is_terminal() {
                return level;
            }
            if spins < DETECTION_SPINS_BEFORE_YIELD {
                std::hint::spin_loop();
                spins += 1;
            } else {
                std::thread::yield_now();
            }
        }
    }
}

impl Default for CapabilityDetector {
    fn default() -> Self {
        Self::new()
    }
}

static DETECTOR: CapabilityDetector = CapabilityDetector::new();

/// The process-wide detector
#[inline]
pub fn global() -> &'static CapabilityDetector {
    &DETECTOR
}

/// Resolve the process-wide capability level
#[inline]
pub fn level() -> CapabilityLevel {
    let current = DETECTOR.peek();
    if current.is_terminal() {
        return current;
    }
    DETECTOR.get_or_detect_with(|| match config::current().capability {
        CapabilityPreference::Basic => false,
        CapabilityPreference::Auto => direct::probe(),
    })
}
