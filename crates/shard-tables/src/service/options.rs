//! Per-call deadline and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::{ProvisionStage, ShardError};

/// Longest uninterrupted sleep, so cancellation is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Cooperative cancellation shared between a caller and a running call.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for a single provisioning call.
///
/// The default has no deadline and no cancellation, leaving the configured
/// lock retry budget as the only bound.
#[derive(Clone, Debug, Default)]
pub struct ResolveOptions {
    /// Give up once this instant has passed.
    pub deadline: Option<Instant>,
    /// Give up once this flag is set.
    pub cancel: Option<CancelFlag>,
}

impl ResolveOptions {
    /// Options with no deadline and no cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Give up `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Give up when `cancel` is set.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Fail if cancelled or past the deadline.
    pub(crate) fn check(&self, stage: ProvisionStage) -> Result<(), ShardError> {
        if self.cancel.as_ref().map_or(false, CancelFlag::is_cancelled) {
            return Err(ShardError::Cancelled { stage });
        }
        if self.deadline.map_or(false, |deadline| Instant::now() >= deadline) {
            return Err(ShardError::DeadlineExceeded { stage });
        }
        Ok(())
    }

    /// Sleep for `delay`, waking early to report cancellation or an expired
    /// deadline.
    pub(crate) fn sleep(&self, delay: Duration, stage: ProvisionStage) -> Result<(), ShardError> {
        let wake_at = Instant::now() + delay;
        loop {
            self.check(stage)?;
            let now = Instant::now();
            if now >= wake_at {
                return Ok(());
            }
            let mut slice = (wake_at - now).min(SLEEP_SLICE);
            if let Some(deadline) = self.deadline {
                slice = slice.min(deadline.saturating_duration_since(now));
            }
            std::thread::sleep(slice);
        }
    }
}
