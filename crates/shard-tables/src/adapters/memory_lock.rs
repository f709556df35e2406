//! In-memory creation lock.
//!
//! Implements `DistributedLock` within a single process. Holders are
//! identified by token and lose the key once the TTL passes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::domain::BackendError;
use crate::ports::outbound::DistributedLock;

#[derive(Debug)]
struct Holder {
    token: String,
    expires_at: Instant,
}

/// In-memory lock table: key -> (token, expiry).
#[derive(Debug, Default)]
pub struct InMemoryLock {
    entries: Mutex<HashMap<String, Holder>>,
    acquire_calls: AtomicU64,
    fail_acquires: AtomicU32,
}

impl InMemoryLock {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is held by a live holder.
    pub fn is_held(&self, key: &str) -> bool {
        self.holder(key).is_some()
    }

    /// Token of the live holder of `key`.
    pub fn holder(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .filter(|h| h.expires_at > now)
            .map(|h| h.token.clone())
    }

    /// Number of acquisition attempts served.
    pub fn acquire_count(&self) -> u64 {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    /// Fail the next `n` acquisition attempts with a backend error.
    pub fn fail_next_acquires(&self, n: u32) {
        self.fail_acquires.store(n, Ordering::SeqCst);
    }
}

impl DistributedLock for InMemoryLock {
    fn acquire_if_absent(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, BackendError> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_acquires
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BackendError::new("injected lock failure"));
        }

        let now = Instant::now();
        let mut entries = self.entries.lock();
        if entries.get(key).map_or(false, |h| h.expires_at > now) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Holder {
                token: token.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    fn release(&self, key: &str, token: &str) -> Result<(), BackendError> {
        let mut entries = self.entries.lock();
        if entries.get(key).map_or(false, |h| h.token == token) {
            entries.remove(key);
        }
        Ok(())
    }
}
