//! Provisioner configuration.
//!
//! Defaults: a 5s lock TTL and 50 attempts 100ms apart, so a writer gives
//! up before a crashed holder's key would expire.

use std::env;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::ShardError;

/// Delay policy between lock attempts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Constant `lock_retry_interval_ms` between attempts.
    #[default]
    Fixed,
    /// Doubling from `lock_retry_interval_ms` up to `max_backoff_ms`, with
    /// full jitter.
    Exponential,
}

/// Configuration for shard table provisioning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionerConfig {
    /// Lock time-to-live in milliseconds.
    pub lock_ttl_ms: u64,
    /// Lock attempts before giving up.
    pub lock_max_attempts: u32,
    /// Base delay between lock attempts in milliseconds.
    pub lock_retry_interval_ms: u64,
    /// Prefix of lock keys (`<prefix>_<schema>_<primary>`).
    pub lock_key_prefix: String,
    /// Delay policy between attempts.
    pub backoff: BackoffStrategy,
    /// Upper bound of a single exponential delay in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            lock_ttl_ms: 5_000,
            lock_max_attempts: 50,
            lock_retry_interval_ms: 100,
            lock_key_prefix: "SHARDING_TABLE_LOCK".to_string(),
            backoff: BackoffStrategy::Fixed,
            max_backoff_ms: 500,
        }
    }
}

impl ProvisionerConfig {
    /// Create configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast settings for tests.
    pub fn for_testing() -> Self {
        Self {
            lock_ttl_ms: 2_000,
            lock_max_attempts: 20,
            lock_retry_interval_ms: 5,
            max_backoff_ms: 20,
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SHARD_LOCK_TTL_MS`: Lock TTL (default: 5000)
    /// - `SHARD_LOCK_MAX_ATTEMPTS`: Lock attempts (default: 50)
    /// - `SHARD_LOCK_RETRY_INTERVAL_MS`: Delay between attempts (default: 100)
    /// - `SHARD_LOCK_KEY_PREFIX`: Lock key prefix (default: SHARDING_TABLE_LOCK)
    /// - `SHARD_LOCK_BACKOFF`: `fixed` or `exponential` (default: fixed)
    /// - `SHARD_LOCK_MAX_BACKOFF_MS`: Exponential delay cap (default: 500)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Self::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |name: &str| lookup(name).and_then(|v| v.trim().parse().ok());

        Self {
            lock_ttl_ms: parsed("SHARD_LOCK_TTL_MS").unwrap_or(defaults.lock_ttl_ms),
            lock_max_attempts: parsed("SHARD_LOCK_MAX_ATTEMPTS")
                .map(|v: u64| u32::try_from(v).unwrap_or(u32::MAX))
                .unwrap_or(defaults.lock_max_attempts),
            lock_retry_interval_ms: parsed("SHARD_LOCK_RETRY_INTERVAL_MS")
                .unwrap_or(defaults.lock_retry_interval_ms),
            lock_key_prefix: lookup("SHARD_LOCK_KEY_PREFIX")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.lock_key_prefix),
            backoff: lookup("SHARD_LOCK_BACKOFF")
                .map(|v| match v.trim().to_lowercase().as_str() {
                    "exponential" | "exp" => BackoffStrategy::Exponential,
                    _ => BackoffStrategy::Fixed,
                })
                .unwrap_or(defaults.backoff),
            max_backoff_ms: parsed("SHARD_LOCK_MAX_BACKOFF_MS").unwrap_or(defaults.max_backoff_ms),
        }
    }

    /// Set the lock TTL.
    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl_ms = ttl.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Set the number of lock attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.lock_max_attempts = attempts;
        self
    }

    /// Set the base delay between lock attempts.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.lock_retry_interval_ms = interval.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Set the lock key prefix.
    pub fn with_lock_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.lock_key_prefix = prefix.into();
        self
    }

    /// Use exponential backoff capped at `max`.
    pub fn with_exponential_backoff(mut self, max: Duration) -> Self {
        self.backoff = BackoffStrategy::Exponential;
        self.max_backoff_ms = max.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), ShardError> {
        if self.lock_ttl_ms == 0 {
            return Err(ShardError::Configuration(
                "lock_ttl_ms must be greater than zero".to_string(),
            ));
        }
        if self.lock_max_attempts == 0 {
            return Err(ShardError::Configuration(
                "lock_max_attempts must be greater than zero".to_string(),
            ));
        }
        if self.lock_key_prefix.trim().is_empty() {
            return Err(ShardError::Configuration(
                "lock_key_prefix must not be blank".to_string(),
            ));
        }
        if self.backoff == BackoffStrategy::Exponential
            && self.max_backoff_ms < self.lock_retry_interval_ms
        {
            return Err(ShardError::Configuration(
                "max_backoff_ms must not be below lock_retry_interval_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Lock TTL.
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.lock_ttl_ms)
    }

    /// Lock key for a logical table. Every bucket of the same table shares it.
    pub fn lock_key(&self, schema: &str, primary: &str) -> String {
        format!("{}_{}_{}", self.lock_key_prefix, schema, primary)
    }

    /// Longest delay slept after failed attempt `attempt` (1-based).
    pub fn max_delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            BackoffStrategy::Fixed => Duration::from_millis(self.lock_retry_interval_ms),
            BackoffStrategy::Exponential => {
                let shift = attempt.saturating_sub(1).min(32);
                let grown = self.lock_retry_interval_ms.saturating_mul(1u64 << shift);
                Duration::from_millis(grown.min(self.max_backoff_ms))
            }
        }
    }

    /// Delay to sleep after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let ceiling = self.max_delay_after(attempt);
        match self.backoff {
            BackoffStrategy::Fixed => ceiling,
            BackoffStrategy::Exponential => {
                let ceiling_ms = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
                Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling_ms))
            }
        }
    }

    /// Upper bound on time spent sleeping between lock attempts.
    pub fn worst_case_wait(&self) -> Duration {
        (1..self.lock_max_attempts)
            .map(|attempt| self.max_delay_after(attempt))
            .sum()
    }
}
