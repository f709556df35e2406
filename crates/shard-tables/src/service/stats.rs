//! # Provisioning Statistics
//!
//! Counters describing how provisioning calls were answered.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Provisioning counters, shared by every provisioner of a service.
#[derive(Debug, Default)]
pub struct ProvisionStats {
    /// Calls answered from the existence cache
    pub cache_hits: AtomicU64,
    /// Successful lock acquisitions
    pub lock_acquisitions: AtomicU64,
    /// Failed lock attempts that were retried
    pub lock_retries: AtomicU64,
    /// Lock retry budgets exhausted
    pub lock_exhaustions: AtomicU64,
    /// Tables found by the existence check under lock
    pub existing_confirmed: AtomicU64,
    /// Tables created from the template
    pub tables_created: AtomicU64,
    /// Calls that returned an error
    pub failures: AtomicU64,
}

/// Point-in-time copy of [`ProvisionStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionStatsSnapshot {
    /// Calls answered from the existence cache
    pub cache_hits: u64,
    /// Successful lock acquisitions
    pub lock_acquisitions: u64,
    /// Failed lock attempts that were retried
    pub lock_retries: u64,
    /// Lock retry budgets exhausted
    pub lock_exhaustions: u64,
    /// Tables found by the existence check under lock
    pub existing_confirmed: u64,
    /// Tables created from the template
    pub tables_created: u64,
    /// Calls that returned an error
    pub failures: u64,
}

impl ProvisionStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lock_acquired(&self) {
        self.lock_acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lock_retry(&self) {
        self.lock_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lock_exhausted(&self) {
        self.lock_exhaustions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_existing(&self) {
        self.existing_confirmed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_created(&self) {
        self.tables_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> ProvisionStatsSnapshot {
        ProvisionStatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            lock_acquisitions: self.lock_acquisitions.load(Ordering::Relaxed),
            lock_retries: self.lock_retries.load(Ordering::Relaxed),
            lock_exhaustions: self.lock_exhaustions.load(Ordering::Relaxed),
            existing_confirmed: self.existing_confirmed.load(Ordering::Relaxed),
            tables_created: self.tables_created.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
