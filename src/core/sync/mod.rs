/*!
 * Address Wait Engine
 *
 * Block a thread until the bytes at a memory address change, and wake threads
 * blocked on an address.
 *
 * # Architecture
 *
 * Two blocking tiers sit behind one facade:
 * - **Direct**: the platform's address-wait primitive (futex on Linux,
 *   `WaitOnAddress` on Windows) for naturally aligned values of native size
 * - **Indirect**: a sharded table of per-address slots (mutex, condvar,
 *   generation counter) for every other value or when the platform has none
 *
 * A one-time capability probe decides whether the direct tier exists. Each
 * wait carries a [`WaitContext`] that keeps its deadline and spin budget
 * across spurious wakes.
 *
 * # Use Cases
 *
 * - **Atomic wait/notify**: block on `AtomicU32` and friends until they change
 * - **Custom equality**: wait on a key while a predicate holds
 * - **Wide atomic emulation**: per-address striped locks
 */

mod atomic;
mod bytes;
pub mod capability;
pub mod config;
mod context;
pub mod deadline;
mod direct;
mod indirect;
mod lock_table;
mod spin;
mod traits;
mod wait;

pub use atomic::{
    notify_all_atomic, notify_one_atomic, wait_until_changed, wait_value, AtomicWord,
};
pub use capability::{CapabilityDetector, CapabilityLevel};
pub use config::{CapabilityPreference, SyncConfig};
pub use context::{make_context, Tier, WaitContext, WaitPhase};
pub use deadline::Deadline;
pub use direct::DirectEngine;
pub use indirect::{wait_table, WaitTable};
pub use lock_table::striped_lock;
pub use spin::SpinDecision;
pub use traits::{WaitEngine, WakeResult};
pub use wait::{notify_all, notify_one, tier_for, wait, wait_while};
