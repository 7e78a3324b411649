/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 *
 * The wait/notify operations themselves never fail: timeouts are reported as
 * `false`, allocation pressure degrades to a spurious wake. Errors only appear
 * at the configuration boundary and in the typed collaborator helpers.
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("Spin count {value} for {tier} waits exceeds maximum {max}")]
    #[diagnostic(
        code(config::spin_count_too_large),
        help("Spinning that long burns CPU without lowering latency. Lower the spin count.")
    )]
    SpinCountTooLarge { tier: String, value: u32, max: u32 },

    #[error("Direct wait size {0} is not supported natively on this platform")]
    #[diagnostic(
        code(config::unsupported_direct_size),
        help("Remove the size from direct_sizes; such waits go through the wait table.")
    )]
    UnsupportedDirectSize(usize),

    #[error("Wait table shard count {0} is invalid")]
    #[diagnostic(
        code(config::invalid_shard_count),
        help("Shard count must be a power of two between 8 and 512.")
    )]
    InvalidShardCount(usize),

    #[error("Environment variable {name} has invalid value {value:?}")]
    #[diagnostic(
        code(config::invalid_env),
        help("Check the variable is an unsigned integer (or 0/1/true/false for flags).")
    )]
    InvalidEnv { name: String, value: String },

    #[error("Wait engine configuration already installed")]
    #[diagnostic(
        code(config::already_installed),
        help("Install configuration once, before the first wait or notify.")
    )]
    AlreadyInstalled,
}

/// Errors from the typed wait helpers
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum WaitError {
    #[error("Wait operation timed out")]
    #[diagnostic(
        code(wait::timeout),
        help("The value never changed before the deadline. Retry or extend the timeout.")
    )]
    Timeout,
}

/// Result type for typed wait operations
pub type WaitResult<T> = Result<T, WaitError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnsupportedDirectSize(3);
        assert_eq!(
            err.to_string(),
            "Direct wait size 3 is not supported natively on this platform"
        );
    }

    #[test]
    fn test_config_error_serialization() {
        let err = ConfigError::InvalidShardCount(7);
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"error_type":"invalid_shard_count","details":7}"#);

        let back: ConfigError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_wait_error_diagnostic_code() {
        let code = WaitError::Timeout.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("wait::timeout"));
    }
}
