//! Configuration Module
//!
//! Construction-time options for a [`Store`]: a plain [`StoreConfig`] that can
//! be loaded from environment variables, and a [`StoreBuilder`] on top of it
//! for the options that cannot come from the environment (preloaded values,
//! clock).

use std::collections::HashMap;
use std::env;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Clock, Store, SystemClock};
use crate::error::{CacheError, Result};

/// Sweep interval used when none (or zero) is configured.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Store configuration parameters.
///
/// Zero durations mean "not set": no default TTL, and the default sweep
/// interval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Capacity hint for the entry table
    pub initial_capacity: usize,
    /// TTL applied to entries stored without one
    pub default_ttl: Duration,
    /// Whether entries that receive the default TTL also reset on read
    pub default_ttl_reset: bool,
    /// Interval between reaper sweeps
    pub sweep_interval: Duration,
}

impl StoreConfig {
    /// Creates a new StoreConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_INITIAL_CAPACITY` - Table capacity hint (default: 0)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 0, none)
    /// - `CACHE_DEFAULT_TTL_RESET` - `true`/`false`/`1`/`0` (default: false)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Reaper interval in milliseconds (default: 1000)
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            initial_capacity: parse_var("CACHE_INITIAL_CAPACITY")?.unwrap_or(0),
            default_ttl: parse_var("CACHE_DEFAULT_TTL_MS")?
                .map(Duration::from_millis)
                .unwrap_or_default(),
            default_ttl_reset: false,
            sweep_interval: parse_var("CACHE_SWEEP_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_SWEEP_INTERVAL),
        };

        if let Some(reset) = read_var("CACHE_DEFAULT_TTL_RESET") {
            let parsed = match reset.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(CacheError::InvalidConfig {
                        var: "CACHE_DEFAULT_TTL_RESET",
                        value: reset,
                        reason: "expected true, false, 1 or 0".to_string(),
                    })
                }
            };
            config.default_ttl_reset = parsed && !config.default_ttl.is_zero();
        }

        Ok(config)
    }

    /// Returns the interval the reaper actually ticks at.
    pub fn effective_sweep_interval(&self) -> Duration {
        if self.sweep_interval.is_zero() {
            DEFAULT_SWEEP_INTERVAL
        } else {
            self.sweep_interval
        }
    }
}

fn read_var(var: &'static str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(var: &'static str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    read_var(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| CacheError::InvalidConfig {
                    var,
                    value: value.clone(),
                    reason: e.to_string(),
                })
        })
        .transpose()
}

// == Store Builder ==
/// Builder for [`Store`].
///
/// Options may be given in any order; setting the same option twice keeps
/// the last value.
///
/// ```
/// use std::time::Duration;
/// use ttl_store::Store;
///
/// let store: Store<String, u32> = Store::builder()
///     .default_ttl(Duration::from_secs(30))
///     .sweep_interval(Duration::from_millis(500))
///     .build();
/// assert_eq!(store.count(), 0);
/// ```
#[derive(Debug)]
pub struct StoreBuilder<K, V> {
    config: StoreConfig,
    values: HashMap<K, V>,
    clock: Arc<dyn Clock>,
}

impl<K, V> Default for StoreBuilder<K, V> {
    fn default() -> Self {
        Self::from_config(StoreConfig::default())
    }
}

impl<K, V> StoreBuilder<K, V> {
    /// Creates a builder with every option unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    pub fn from_config(config: StoreConfig) -> Self {
        Self {
            config,
            values: HashMap::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Capacity hint for the entry table.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    /// Values loaded into the store at build time, without TTL.
    ///
    /// The table is sized for at least `values.len()` entries, whatever the
    /// capacity hint says.
    pub fn values(mut self, values: HashMap<K, V>) -> Self {
        self.values = values;
        self
    }

    /// TTL given to entries stored without their own.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self.config.default_ttl_reset = false;
        self
    }

    /// Same as [`default_ttl`](Self::default_ttl), and entries that get it
    /// also reset their TTL on read. Ignored for a zero TTL.
    pub fn default_ttl_with_reset(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self.config.default_ttl_reset = !ttl.is_zero();
        self
    }

    /// Interval between reaper sweeps. Zero selects the 1 second default.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Time source for the store. Must be chosen before the store is shared.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configuration accumulated so far.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl<K, V> StoreBuilder<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Builds the store.
    pub fn build(self) -> Store<K, V> {
        Store::from_parts(self.config, self.values, self.clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize the tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 4] = [
        "CACHE_INITIAL_CAPACITY",
        "CACHE_DEFAULT_TTL_MS",
        "CACHE_DEFAULT_TTL_RESET",
        "CACHE_SWEEP_INTERVAL_MS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_config_default() {
        let config = StoreConfig::default();
        assert_eq!(config.initial_capacity, 0);
        assert_eq!(config.default_ttl, Duration::ZERO);
        assert!(!config.default_ttl_reset);
        assert_eq!(config.sweep_interval, Duration::ZERO);
        assert_eq!(config.effective_sweep_interval(), DEFAULT_SWEEP_INTERVAL);
    }

    #[test]
    fn test_config_from_env_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let config = StoreConfig::from_env().unwrap();
        assert_eq!(config.initial_capacity, 0);
        assert_eq!(config.default_ttl, Duration::ZERO);
        assert!(!config.default_ttl_reset);
        assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
    }

    #[test]
    fn test_config_from_env_values() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("CACHE_INITIAL_CAPACITY", "64");
        env::set_var("CACHE_DEFAULT_TTL_MS", "1500");
        env::set_var("CACHE_DEFAULT_TTL_RESET", "TRUE");
        env::set_var("CACHE_SWEEP_INTERVAL_MS", "250");

        let config = StoreConfig::from_env();
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.initial_capacity, 64);
        assert_eq!(config.default_ttl, Duration::from_millis(1500));
        assert!(config.default_ttl_reset);
        assert_eq!(config.sweep_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_config_from_env_reset_without_ttl_is_ignored() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("CACHE_DEFAULT_TTL_RESET", "1");

        let config = StoreConfig::from_env();
        clear_env();

        assert!(!config.unwrap().default_ttl_reset);
    }

    #[test]
    fn test_config_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("CACHE_SWEEP_INTERVAL_MS", "soon");

        let result = StoreConfig::from_env();
        clear_env();

        assert!(matches!(
            result,
            Err(CacheError::InvalidConfig { var: "CACHE_SWEEP_INTERVAL_MS", .. })
        ));
    }

    #[test]
    fn test_config_from_env_invalid_bool() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("CACHE_DEFAULT_TTL_RESET", "maybe");

        let result = StoreConfig::from_env();
        clear_env();

        assert!(matches!(
            result,
            Err(CacheError::InvalidConfig { var: "CACHE_DEFAULT_TTL_RESET", .. })
        ));
    }

    #[test]
    fn test_builder_last_option_wins() {
        let builder = StoreBuilder::<String, String>::new()
            .default_ttl_with_reset(Duration::from_secs(1))
            .default_ttl(Duration::from_secs(2))
            .sweep_interval(Duration::from_secs(3))
            .sweep_interval(Duration::from_secs(15));

        assert_eq!(builder.config().default_ttl, Duration::from_secs(2));
        assert!(!builder.config().default_ttl_reset);
        assert_eq!(builder.config().sweep_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_builder_zero_default_ttl_ignores_reset() {
        let builder = StoreBuilder::<String, String>::new().default_ttl_with_reset(Duration::ZERO);

        assert!(!builder.config().default_ttl_reset);
    }
}
