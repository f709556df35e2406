//! Shared test fixtures.

use std::sync::Arc;

use shard_tables::{
    DistributedLock, InMemoryCatalog, InMemoryLock, ProvisionerConfig, ShardCatalog,
    ShardTableService,
};

/// Schema used throughout the suite.
pub const SCHEMA: &str = "app";

/// Template table used throughout the suite.
pub const PRIMARY: &str = "driver_hour";

/// Lock key every bucket of [`PRIMARY`] shares under the default prefix.
pub const LOCK_KEY: &str = "SHARDING_TABLE_LOCK_app_driver_hour";

/// Template DDL as `SHOW CREATE TABLE` returns it.
pub const TEMPLATE_DDL: &str = "CREATE TABLE `driver_hour` (
  `id` bigint NOT NULL AUTO_INCREMENT,
  `driver_id` bigint NOT NULL,
  `online_seconds` int NOT NULL DEFAULT '0',
  PRIMARY KEY (`id`),
  KEY `idx_driver_hour_driver` (`driver_id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

/// Catalog holding only the template table.
pub fn template_catalog() -> Arc<InMemoryCatalog> {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.add_table(SCHEMA, PRIMARY, TEMPLATE_DDL);
    catalog
}

/// Service over `catalog` and `lock` with fast test settings.
pub fn service(
    catalog: Arc<dyn ShardCatalog>,
    lock: Arc<dyn DistributedLock>,
) -> ShardTableService {
    ShardTableService::new(catalog, lock, ProvisionerConfig::for_testing())
}

/// Service over a fresh template catalog and in-memory lock.
pub fn in_memory_service() -> (Arc<InMemoryCatalog>, Arc<InMemoryLock>, ShardTableService) {
    crate::init_test_tracing();
    let catalog = template_catalog();
    let lock = Arc::new(InMemoryLock::new());
    let service = service(catalog.clone(), lock.clone());
    (catalog, lock, service)
}
