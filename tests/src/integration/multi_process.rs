//! # Multi-Process Provisioning
//!
//! Independent services, each with its own cache as separate processes
//! would have, coordinating through one `FileLock` directory and one
//! catalog.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};

    use chrono::{TimeZone, Utc};
    use shard_tables::{
        DistributedLock, FileLock, Granularity, ProvisionRequest, ProvisionerConfig,
        ShardError, ShardTableApi, ShardTableService,
    };
    use tempfile::TempDir;

    use crate::fixtures::{service, template_catalog, LOCK_KEY, PRIMARY, SCHEMA};

    const PROCESSES: usize = 6;

    #[test]
    fn test_processes_create_table_once() {
        crate::init_test_tracing();
        let dir = TempDir::new().unwrap();
        let catalog = template_catalog();
        let barrier = Barrier::new(PROCESSES);
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();

        let names: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..PROCESSES)
                .map(|_| {
                    let catalog = catalog.clone();
                    let path = dir.path().to_path_buf();
                    let barrier = &barrier;
                    s.spawn(move || {
                        let lock = Arc::new(FileLock::open(path).unwrap());
                        let process = service(catalog, lock);
                        barrier.wait();
                        let request =
                            ProvisionRequest::new(SCHEMA, PRIMARY, instant, Granularity::Month);
                        process.resolve_and_provision_table(&request).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(names.iter().all(|n| n == "driver_hour_202403"));
        assert_eq!(catalog.execute_count(), 1);

        let lock = FileLock::open(dir.path()).unwrap();
        assert!(lock.holder(LOCK_KEY).unwrap().is_none());
    }

    #[test]
    fn test_second_process_confirms_under_lock() {
        let dir = TempDir::new().unwrap();
        let catalog = template_catalog();
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
        let request = ProvisionRequest::new(SCHEMA, PRIMARY, instant, Granularity::Year);

        let first = service(catalog.clone(), Arc::new(FileLock::open(dir.path()).unwrap()));
        let second = service(catalog.clone(), Arc::new(FileLock::open(dir.path()).unwrap()));

        first.resolve_and_provision_table(&request).unwrap();
        assert_eq!(
            second.resolve_and_provision_table(&request).unwrap(),
            "driver_hour_2024"
        );

        assert_eq!(catalog.execute_count(), 1);
        assert_eq!(second.stats().snapshot().existing_confirmed, 1);
        assert_eq!(second.stats().snapshot().tables_created, 0);
    }

    #[test]
    fn test_stale_holder_blocks_until_budget_runs_out() {
        let dir = TempDir::new().unwrap();
        let lock = Arc::new(FileLock::open(dir.path()).unwrap());
        lock.acquire_if_absent(LOCK_KEY, "crashed-process", std::time::Duration::from_secs(60))
            .unwrap();

        let config = ProvisionerConfig::for_testing()
            .with_max_attempts(3)
            .with_retry_interval(std::time::Duration::from_millis(1));
        let catalog = template_catalog();
        let process = ShardTableService::new(catalog.clone(), lock.clone(), config);
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();

        let err = process
            .resolve_and_provision_table(&ProvisionRequest::new(
                SCHEMA,
                PRIMARY,
                instant,
                Granularity::Day,
            ))
            .unwrap_err();

        assert!(matches!(err, ShardError::LockAcquisition { attempts: 3, .. }));
        assert_eq!(catalog.execute_count(), 0);
        assert_eq!(
            lock.holder(LOCK_KEY).unwrap().as_deref(),
            Some("crashed-process")
        );
    }

    #[test]
    fn test_expired_holder_is_taken_over() {
        let dir = TempDir::new().unwrap();
        let lock = Arc::new(FileLock::open(dir.path()).unwrap());
        lock.acquire_if_absent(LOCK_KEY, "crashed-process", std::time::Duration::from_millis(30))
            .unwrap();

        let catalog = template_catalog();
        let process = service(catalog.clone(), lock.clone());
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
        let name = process
            .resolve_and_provision_table(&ProvisionRequest::new(
                SCHEMA,
                PRIMARY,
                instant,
                Granularity::Day,
            ))
            .unwrap();

        assert_eq!(name, "driver_hour_20240315");
        assert_eq!(catalog.execute_count(), 1);
    }
}
