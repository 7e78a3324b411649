/*!
 * Wait Engine Configuration
 *
 * Runtime configuration for tier selection and spin policy. One configuration
 * is installed per process, before first use; afterwards it is read-only.
 */

use crate::core::errors::ConfigError;
use crate::core::limits::{
    DEFAULT_DIRECT_SPIN_COUNT, DEFAULT_INDIRECT_SPIN_COUNT, LONG_WAIT_SPIN_COUNT,
    LOW_LATENCY_SPIN_COUNT, MAX_SPIN_COUNT, MAX_TABLE_SHARDS, MIN_TABLE_SHARDS,
};
use crate::core::shard_manager::ShardManager;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const ENV_SPIN_COUNT: &str = "ADDR_WAIT_SPIN_COUNT";
pub const ENV_FORCE_BASIC: &str = "ADDR_WAIT_FORCE_BASIC";
pub const ENV_TABLE_SHARDS: &str = "ADDR_WAIT_TABLE_SHARDS";

/// Which capability level the detector may resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityPreference {
    /// Probe the platform and use the native primitive when present
    #[default]
    Auto,
    /// Skip the probe; every wait goes through the wait table
    Basic,
}

/// Value widths the platform can block on without the wait table
#[inline]
pub fn native_direct_sizes() -> &'static [usize] {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        &[4]
    }
    #[cfg(windows)]
    {
        &[1, 2, 4, 8]
    }
    #[cfg(not(any(target_os = "linux", target_os = "android", windows)))]
    {
        &[]
    }
}

/// Wait engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Capability detection preference
    pub capability: CapabilityPreference,
    /// Spin iterations before a direct wait blocks
    pub direct_spin_count: u32,
    /// Spin iterations before an indirect wait blocks
    pub indirect_spin_count: u32,
    /// Value sizes eligible for direct waits (subset of the native sizes)
    pub direct_sizes: Vec<usize>,
    /// Wait table shard count (`None` derives it from the CPU count)
    pub table_shards: Option<usize>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            capability: CapabilityPreference::Auto,
            direct_spin_count: DEFAULT_DIRECT_SPIN_COUNT,
            indirect_spin_count: DEFAULT_INDIRECT_SPIN_COUNT,
            direct_sizes: native_direct_sizes().to_vec(),
            table_shards: None,
        }
    }
}

impl SyncConfig {
    /// Configuration optimized for low-latency (< 1ms wait expected)
    pub fn low_latency() -> Self {
        Self {
            direct_spin_count: LOW_LATENCY_SPIN_COUNT,
            ..Self::default()
        }
    }

    /// Configuration optimized for long waits (> 1ms expected)
    pub fn long_wait() -> Self {
        Self {
            direct_spin_count: LONG_WAIT_SPIN_COUNT,
            ..Self::default()
        }
    }

    /// Table-only configuration, identical behavior on every platform
    pub fn portable() -> Self {
        Self {
            capability: CapabilityPreference::Basic,
            direct_sizes: Vec::new(),
            ..Self::default()
        }
    }

    /// Check the configuration against platform and engine limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (tier, value) in [
            ("direct", self.direct_spin_count),
            ("indirect", self.indirect_spin_count),
        ] {
            if value > MAX_SPIN_COUNT {
                return Err(ConfigError::SpinCountTooLarge {
                    tier: tier.to_string(),
                    value,
                    max: MAX_SPIN_COUNT,
                });
            }
        }

        let native = native_direct_sizes();
        if let Some(&size) = self.direct_sizes.iter().find(|s| !native.contains(s)) {
            return Err(ConfigError::UnsupportedDirectSize(size));
        }

        if let Some(shards) = self.table_shards {
            if !shards.is_power_of_two() || !(MIN_TABLE_SHARDS..=MAX_TABLE_SHARDS).contains(&shards)
            {
                return Err(ConfigError::InvalidShardCount(shards));
            }
        }

        Ok(())
    }

    /// Default configuration overridden by `ADDR_WAIT_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_SPIN_COUNT) {
            config.direct_spin_count = parse_env(ENV_SPIN_COUNT, &raw)?;
        }

        if let Some(raw) = lookup(ENV_FORCE_BASIC) {
            let forced = match raw.trim() {
                "1" | "true" => true,
                "0" | "false" | "" => false,
                _ => return Err(invalid_env(ENV_FORCE_BASIC, &raw)),
            };
            if forced {
                config.capability = CapabilityPreference::Basic;
            }
        }

        if let Some(raw) = lookup(ENV_TABLE_SHARDS) {
            config.table_shards = Some(parse_env(ENV_TABLE_SHARDS, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Whether a value of `size` bytes may use the direct tier
    #[inline]
    pub fn is_direct_size(&self, size: usize) -> bool {
        self.direct_sizes.contains(&size)
    }

    /// Resolved shard count for the wait table
    pub fn resolved_table_shards(&self) -> usize {
        self.table_shards
            .unwrap_or_else(ShardManager::table_shards)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| invalid_env(name, raw))
}

fn invalid_env(name: &str, raw: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        name: name.to_string(),
        value: raw.to_string(),
    }
}

static CONFIG: OnceLock<SyncConfig> = OnceLock::new();

/// Install the process-wide configuration
///
/// Must run before the first wait or notify; fails once a configuration
/// (explicit or lazily defaulted) is in place.
pub fn install(config: SyncConfig) -> Result<(), ConfigError> {
    config.validate()?;
    let mut pending = Some(config);
    CONFIG.get_or_init(|| pending.take().unwrap_or_default());
    match pending {
        None => {
            tracing::debug!(config = ?current(), "wait engine configuration installed");
            Ok(())
        }
        Some(_) => Err(ConfigError::AlreadyInstalled),
    }
}

/// Process-wide configuration, initialized from the environment on first use
pub fn current() -> &'static SyncConfig {
    CONFIG.get_or_init(|| {
        SyncConfig::from_env().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring invalid wait engine environment configuration");
            SyncConfig::default()
        })
    })
}
