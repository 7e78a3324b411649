/*!
 * Spin Controller
 *
 * Decides, per retry of a wait loop, whether to spin or block. State lives in
 * the caller's `WaitContext`:
 *
 * 1. **Init**: budget loaded for the chosen tier (direct waits get a short
 *    spin, indirect waits none by default)
 * 2. **Spinning**: one `spin_loop()` hint per step while budget remains
 * 3. **Blocked**: every later step says block until the context is dropped
 */

use super::config::SyncConfig;
use super::context::{Tier, WaitContext, WaitPhase};

/// Outcome of one spin-controller step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinDecision {
    /// Re-check the value after a CPU pause
    Spin,
    /// Hand off to a blocking tier
    Block,
}

/// Spin budget for a tier under `config`
#[inline]
pub fn initial_budget(config: &SyncConfig, tier: Tier) -> u32 {
    match tier {
        Tier::Direct => config.direct_spin_count,
        Tier::Indirect => config.indirect_spin_count,
    }
}

impl WaitContext {
    /// Advance the spin state machine by one step
    #[inline]
    pub(crate) fn spin_step(&mut self, config: &SyncConfig, tier: Tier) -> SpinDecision {
        if self.phase == WaitPhase::Init {
            self.spin_budget = initial_budget(config, tier);
            self.phase = WaitPhase::Spinning;
        }

        if self.phase != WaitPhase::Spinning {
            return SpinDecision::Block;
        }

        if self.spin_budget > 0 {
            self.spin_budget -= 1;
            std::hint::spin_loop();
            SpinDecision::Spin
        } else {
            self.phase = WaitPhase::BlockedNone;
            SpinDecision::Block
        }
    }
}
