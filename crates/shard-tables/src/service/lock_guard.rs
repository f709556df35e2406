//! # Creation Lock Guard
//!
//! Holds the shard creation lock for one logical table and releases it on
//! drop (RAII), on every exit path.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::options::ResolveOptions;
use super::stats::ProvisionStats;
use crate::config::ProvisionerConfig;
use crate::domain::{ProvisionStage, ShardError};
use crate::ports::DistributedLock;

/// Held creation lock. Dropping it releases the key.
pub struct LockGuard {
    lock: Arc<dyn DistributedLock>,
    key: String,
    token: String,
}

impl LockGuard {
    /// Acquire `key`, retrying per `config` until the attempt budget, the
    /// deadline or cancellation ends the wait.
    ///
    /// A backend error counts as a failed attempt; the last one is reported
    /// if the budget runs out.
    pub(crate) fn acquire(
        lock: &Arc<dyn DistributedLock>,
        key: String,
        config: &ProvisionerConfig,
        options: &ResolveOptions,
        stats: &ProvisionStats,
    ) -> Result<Self, ShardError> {
        let token = Uuid::new_v4().to_string();
        let ttl = config.lock_ttl();
        let mut last_error = None;

        for attempt in 1..=config.lock_max_attempts {
            options.check(ProvisionStage::LockWait)?;

            match lock.acquire_if_absent(&key, &token, ttl) {
                Ok(true) => {
                    debug!("[shard-tables] lock {} acquired on attempt {}", key, attempt);
                    stats.record_lock_acquired();
                    return Ok(Self {
                        lock: Arc::clone(lock),
                        key,
                        token,
                    });
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("[shard-tables] lock {} attempt {} failed: {}", key, attempt, e);
                    last_error = Some(e.to_string());
                }
            }

            if attempt < config.lock_max_attempts {
                stats.record_lock_retry();
                options.sleep(config.delay_after(attempt), ProvisionStage::LockWait)?;
            }
        }

        stats.record_lock_exhausted();
        Err(ShardError::LockAcquisition {
            key,
            attempts: config.lock_max_attempts,
            last_error,
        })
    }

    /// Lock key held by this guard.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Token identifying this holder.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // The TTL reclaims the key if this release is lost.
        match self.lock.release(&self.key, &self.token) {
            Ok(()) => debug!("[shard-tables] lock {} released", self.key),
            Err(e) => warn!("[shard-tables] failed to release lock {}: {}", self.key, e),
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("key", &self.key)
            .field("token", &self.token)
            .finish()
    }
}
