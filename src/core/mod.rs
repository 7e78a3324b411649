/*!
 * Core Module
 * Wait engine, limits, and error handling
 */

pub mod errors;
pub mod limits;
pub mod shard_manager;
pub mod sync;

// Re-export for convenience
pub use errors::*;
pub use shard_manager::ShardManager;
