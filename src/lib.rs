/*!
 * Address Wait Library
 * Blocking wait/notify on arbitrary memory addresses
 */

pub mod core;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{ConfigError, WaitError, WaitResult};
pub use crate::core::sync::{
    make_context, notify_all, notify_all_atomic, notify_one, notify_one_atomic, striped_lock,
    wait, wait_until_changed, wait_value, wait_while, SyncConfig, WaitContext, WakeResult,
};
pub use monitoring::{init_tracing, stats, StatsSnapshot};
