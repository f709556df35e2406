//! # Service Layer
//!
//! `ShardTableService` wires the outbound ports to the shard algorithms and
//! implements the `ShardTableApi` inbound port.
//!
//! One service is shared by every writer in a process; it owns the
//! existence cache, lock budget and statistics that its provisioners share.

pub mod cache;
pub mod lock_guard;
pub mod options;
pub mod provisioner;
pub mod stats;

pub use cache::TableCache;
pub use lock_guard::LockGuard;
pub use options::{CancelFlag, ResolveOptions};
pub use provisioner::{ProvisionerBuilder, ShardTableProvisioner};
pub use stats::{ProvisionStats, ProvisionStatsSnapshot};

use std::sync::Arc;

use chrono::TimeZone;

use crate::algorithms::split_range;
use crate::config::ProvisionerConfig;
use crate::domain::{ProvisionRequest, ShardError, ShardRequest, TimeRange};
use crate::ports::{DistributedLock, ShardCatalog, ShardTableApi};

/// Shard table service.
pub struct ShardTableService {
    catalog: Arc<dyn ShardCatalog>,
    lock: Arc<dyn DistributedLock>,
    cache: Arc<TableCache>,
    config: ProvisionerConfig,
    stats: Arc<ProvisionStats>,
}

impl ShardTableService {
    /// Create a service with a fresh cache.
    pub fn new(
        catalog: Arc<dyn ShardCatalog>,
        lock: Arc<dyn DistributedLock>,
        config: ProvisionerConfig,
    ) -> Self {
        Self::with_cache(catalog, lock, config, Arc::new(TableCache::new()))
    }

    /// Create a service sharing an existing cache.
    pub fn with_cache(
        catalog: Arc<dyn ShardCatalog>,
        lock: Arc<dyn DistributedLock>,
        config: ProvisionerConfig,
        cache: Arc<TableCache>,
    ) -> Self {
        Self {
            catalog,
            lock,
            cache,
            config,
            stats: Arc::new(ProvisionStats::new()),
        }
    }

    /// Provisioner for one request, sharing this service's state.
    pub fn provisioner<Tz: TimeZone>(&self, request: &ProvisionRequest<Tz>) -> ShardTableProvisioner {
        ShardTableProvisioner::builder()
            .catalog(Arc::clone(&self.catalog))
            .lock(Arc::clone(&self.lock))
            .schema(request.schema.clone())
            .primary(request.primary.clone())
            .instant(&request.instant)
            .granularity(request.granularity)
            .cache(Arc::clone(&self.cache))
            .config(self.config.clone())
            .stats(Arc::clone(&self.stats))
            .build()
    }

    /// Resolve and provision, bounded by `options`.
    pub fn resolve_and_provision_table_with<Tz: TimeZone>(
        &self,
        request: &ProvisionRequest<Tz>,
        options: &ResolveOptions,
    ) -> Result<String, ShardError> {
        self.provisioner(request).table_name_with(options)
    }

    /// Existence cache.
    pub fn cache(&self) -> &Arc<TableCache> {
        &self.cache
    }

    /// Lock budget.
    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Provisioning statistics.
    pub fn stats(&self) -> &Arc<ProvisionStats> {
        &self.stats
    }
}

impl ShardTableApi for ShardTableService {
    fn split_range<Tz: TimeZone>(
        &self,
        request: &ShardRequest<Tz>,
    ) -> Result<Vec<TimeRange<Tz>>, ShardError> {
        split_range(request)
    }

    fn resolve_and_provision_table<Tz: TimeZone>(
        &self,
        request: &ProvisionRequest<Tz>,
    ) -> Result<String, ShardError> {
        self.resolve_and_provision_table_with(request, &ResolveOptions::default())
    }
}

impl std::fmt::Debug for ShardTableService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardTableService")
            .field("config", &self.config)
            .field("cached_tables", &self.cache.len())
            .finish_non_exhaustive()
    }
}
