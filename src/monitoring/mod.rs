/*!
 * Monitoring
 * Wait engine counters and tracing setup
 */

mod metrics;
mod tracer;

pub use metrics::{stats, StatsSnapshot, WaitStats};
pub use tracer::{init_tracing, ENV_TRACE_JSON};
