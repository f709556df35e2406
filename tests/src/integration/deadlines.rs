//! # Deadlines and Cancellation
//!
//! Bounding a provisioning call that is stuck waiting for the creation lock.

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use chrono::{TimeZone, Utc};
    use shard_tables::{
        CancelFlag, DistributedLock, Granularity, ProvisionRequest, ProvisionStage,
        ProvisionerConfig, ResolveOptions, ShardError, ShardTableService,
    };

    use crate::fixtures::{in_memory_service, LOCK_KEY, PRIMARY, SCHEMA};

    fn request() -> ProvisionRequest<Utc> {
        let instant = Utc.with_ymd_and_hms(2025, 8, 19, 17, 0, 0).unwrap();
        ProvisionRequest::new(SCHEMA, PRIMARY, instant, Granularity::Hour)
    }

    #[test]
    fn test_deadline_interrupts_lock_wait() {
        let (catalog, lock, service) = in_memory_service();
        lock.acquire_if_absent(LOCK_KEY, "other", Duration::from_secs(60))
            .unwrap();

        let started = Instant::now();
        let options = ResolveOptions::new().with_timeout(Duration::from_millis(30));
        let err = service
            .resolve_and_provision_table_with(&request(), &options)
            .unwrap_err();

        assert!(matches!(
            err,
            ShardError::DeadlineExceeded {
                stage: ProvisionStage::LockWait
            }
        ));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(catalog.execute_count(), 0);
        assert_eq!(lock.holder(LOCK_KEY).as_deref(), Some("other"));
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let (catalog, lock, _) = in_memory_service();
        lock.acquire_if_absent(LOCK_KEY, "other", Duration::from_secs(60))
            .unwrap();
        // enough budget that only cancellation can end the wait
        let config = ProvisionerConfig::for_testing().with_max_attempts(10_000);
        let service = ShardTableService::new(catalog, lock, config);
        let cancel = CancelFlag::new();
        let options = ResolveOptions::new().with_cancel(cancel.clone());

        let err = std::thread::scope(|s| {
            let waiter = s.spawn(|| service.resolve_and_provision_table_with(&request(), &options));
            std::thread::sleep(Duration::from_millis(20));
            cancel.cancel();
            waiter.join().unwrap().unwrap_err()
        });

        assert!(matches!(err, ShardError::Cancelled { .. }));
        assert_eq!(service.stats().snapshot().failures, 1);
    }

    #[test]
    fn test_generous_deadline_succeeds() {
        let (catalog, _lock, service) = in_memory_service();
        let options = ResolveOptions::new().with_timeout(Duration::from_secs(10));

        let name = service
            .resolve_and_provision_table_with(&request(), &options)
            .unwrap();
        assert_eq!(name, "driver_hour_2025081917");
        assert_eq!(catalog.execute_count(), 1);
    }

    #[test]
    fn test_cache_hit_ignores_expired_deadline() {
        let (_catalog, _lock, service) = in_memory_service();
        service
            .resolve_and_provision_table_with(&request(), &ResolveOptions::new())
            .unwrap();

        let expired = ResolveOptions::new().with_deadline(Instant::now());
        assert!(service
            .resolve_and_provision_table_with(&request(), &expired)
            .is_ok());
    }
}
