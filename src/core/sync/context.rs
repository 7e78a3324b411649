/*!
 * Wait Context
 *
 * Caller-owned state for one logical wait loop. Created fresh before the first
 * attempt, mutated by the engine across retries, discarded when the loop ends.
 * It owns no OS resources, only bookkeeping.
 */

use super::deadline::Deadline;
use serde::{Deserialize, Serialize};

/// Which blocking tier serves a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Native address wait, no auxiliary table
    Direct,
    /// Address-keyed mutex/condvar slot in the wait table
    Indirect,
}

/// Lifecycle of a wait context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPhase {
    /// Fresh; deadline not computed yet
    Init,
    /// Consuming the spin budget
    Spinning,
    /// Spin exhausted; no table state held
    BlockedNone,
    /// Subscribed to a slot and sleeping with its mutex held
    BlockedLocked,
    /// Subscribed to a slot (waiter count held, generation captured)
    BlockedCounter,
}

/// Per-wait-loop context
#[derive(Debug, Clone)]
pub struct WaitContext {
    pub(crate) phase: WaitPhase,
    pub(crate) spin_budget: u32,
    pub(crate) deadline: Deadline,
    pub(crate) observed_generation: Option<u64>,
    pub(crate) blocks: u32,
    deadline_fixed: bool,
}

impl WaitContext {
    pub const fn new() -> Self {
        Self {
            phase: WaitPhase::Init,
            spin_budget: 0,
            deadline: Deadline::NEVER,
            observed_generation: None,
            blocks: 0,
            deadline_fixed: false,
        }
    }

    /// Context with its deadline fixed up front
    ///
    /// Any timeout later passed to `wait` with this context is ignored.
    pub fn with_deadline(deadline: Deadline) -> Self {
        let mut ctx = Self::new();
        ctx.deadline = deadline;
        ctx.deadline_fixed = true;
        ctx
    }

    #[inline]
    pub fn phase(&self) -> WaitPhase {
        self.phase
    }

    #[inline]
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    #[inline]
    pub fn spin_budget(&self) -> u32 {
        self.spin_budget
    }

    /// Generation captured by the last indirect subscription
    #[inline]
    pub fn observed_generation(&self) -> Option<u64> {
        self.observed_generation
    }

    /// Number of blocking-tier calls issued through this context
    #[inline]
    pub fn blocks(&self) -> u32 {
        self.blocks
    }

    #[inline]
    pub fn is_blocked(&self) -> bool {
        matches!(
            self.phase,
            WaitPhase::BlockedNone | WaitPhase::BlockedLocked | WaitPhase::BlockedCounter
        )
    }

    /// Fix the deadline on the first attempt of a wait loop
    pub(crate) fn start(&mut self, timeout: Option<std::time::Duration>) {
        if self.phase == WaitPhase::Init && !self.deadline_fixed {
            self.deadline = Deadline::after(timeout);
            self.deadline_fixed = true;
        }
    }
}

impl Default for WaitContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Fresh context for one logical wait loop
#[inline]
pub fn make_context() -> WaitContext {
    WaitContext::new()
}
