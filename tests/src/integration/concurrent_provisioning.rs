//! # Concurrent Provisioning
//!
//! Many writers resolving shard tables through one service at once.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};

    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use rand::Rng;
    use shard_tables::{Granularity, ProvisionRequest, ShardTableApi};

    use crate::fixtures::{in_memory_service, LOCK_KEY, PRIMARY, SCHEMA};

    const WRITERS: usize = 16;

    #[test]
    fn test_concurrent_writers_create_table_once() {
        let (catalog, lock, service) = in_memory_service();
        let instant = Utc.with_ymd_and_hms(2025, 8, 19, 17, 30, 0).unwrap();
        let barrier = Barrier::new(WRITERS);

        let names: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..WRITERS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        let request =
                            ProvisionRequest::new(SCHEMA, PRIMARY, instant, Granularity::Hour);
                        service.resolve_and_provision_table(&request).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(names.iter().all(|n| n == "driver_hour_2025081917"));
        assert_eq!(catalog.execute_count(), 1);
        assert!(catalog.contains_table(SCHEMA, "driver_hour_2025081917"));
        assert!(!lock.is_held(LOCK_KEY));

        let snapshot = service.stats().snapshot();
        assert_eq!(snapshot.tables_created, 1);
        assert_eq!(snapshot.failures, 0);
        // every writer either created, confirmed under lock, or hit the cache
        assert_eq!(
            snapshot.tables_created + snapshot.existing_confirmed + snapshot.cache_hits,
            WRITERS as u64
        );
    }

    #[test]
    fn test_concurrent_writers_across_buckets() {
        let (catalog, lock, service) = in_memory_service();
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let hours: Vec<i64> = {
            let mut rng = rand::thread_rng();
            (0..64).map(|_| rng.gen_range(0..6)).collect()
        };

        std::thread::scope(|s| {
            for chunk in hours.chunks(8) {
                let service = &service;
                s.spawn(move || {
                    for hour in chunk {
                        let instant = base + ChronoDuration::hours(*hour);
                        let request =
                            ProvisionRequest::new(SCHEMA, PRIMARY, instant, Granularity::Hour);
                        service.resolve_and_provision_table(&request).unwrap();
                    }
                });
            }
        });

        let distinct: HashSet<i64> = hours.iter().copied().collect();
        assert_eq!(catalog.execute_count(), distinct.len());
        for hour in distinct {
            let name = format!("driver_hour_20250101{:02}", hour);
            assert!(catalog.contains_table(SCHEMA, &name), "{name} missing");
        }
        assert!(!lock.is_held(LOCK_KEY));
    }

    #[test]
    fn test_provisioning_is_idempotent() {
        let (catalog, _lock, service) = in_memory_service();
        let instant = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        let request = ProvisionRequest::new(SCHEMA, PRIMARY, instant, Granularity::Day);

        let first = service.resolve_and_provision_table(&request).unwrap();
        let second = service.resolve_and_provision_table(&request).unwrap();

        assert_eq!(first, "driver_hour_20240229");
        assert_eq!(first, second);
        assert_eq!(catalog.execute_count(), 1);
        assert_eq!(service.stats().snapshot().cache_hits, 1);
    }

    #[test]
    fn test_ddl_failure_does_not_block_other_writers() {
        let (catalog, lock, service) = in_memory_service();
        catalog.fail_next_executes(1);
        let instant = Utc.with_ymd_and_hms(2025, 8, 19, 17, 0, 0).unwrap();
        let request = ProvisionRequest::new(SCHEMA, PRIMARY, instant, Granularity::Hour);

        assert!(service.resolve_and_provision_table(&request).is_err());
        assert!(!lock.is_held(LOCK_KEY));

        let shared = Arc::new(service);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&shared);
                let request = request.clone();
                std::thread::spawn(move || service.resolve_and_provision_table(&request))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), "driver_hour_2025081917");
        }
        assert_eq!(catalog.execute_count(), 1);
        assert_eq!(shared.stats().snapshot().failures, 1);
    }
}
