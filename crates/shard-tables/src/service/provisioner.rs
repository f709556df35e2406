//! # Shard Table Provisioner
//!
//! Resolves the shard table for one instant and guarantees it exists.
//!
//! ## Flow
//!
//! ```text
//! table_name()
//!   ├── captured builder error? ──────────────► Configuration
//!   ├── cache hit? ───────────────────────────► name (no lock, no I/O)
//!   ├── acquire creation lock (retry budget) ─► LockAcquisition
//!   ├── exists under lock? ───────────────────► cache + name
//!   ├── fetch template DDL ───────────────────► CatalogQuery
//!   ├── rewrite target ───────────────────────► TemplateDdl
//!   └── execute ──────────────────────────────► DdlExecution | cache + name
//! ```
//!
//! The lock is released by [`LockGuard`]'s `Drop` on every path out of the
//! critical section.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, TimeZone};
use tracing::{debug, error, info};

use super::cache::TableCache;
use super::lock_guard::LockGuard;
use super::options::ResolveOptions;
use super::stats::ProvisionStats;
use crate::algorithms::rewrite_create_statement;
use crate::config::ProvisionerConfig;
use crate::domain::{invariant_valid_identifier, Granularity, ProvisionStage, ShardError};
use crate::ports::{DistributedLock, ShardCatalog};

/// Fully validated provisioning target.
#[derive(Clone, Debug)]
struct Target {
    schema: String,
    primary: String,
    table: String,
}

/// Resolves and, when missing, creates one shard table.
///
/// Built with [`ShardTableProvisioner::builder`]. Construction never fails;
/// an incomplete or invalid builder surfaces as [`ShardError::Configuration`]
/// on the first call to [`table_name`](Self::table_name).
pub struct ShardTableProvisioner {
    catalog: Option<Arc<dyn ShardCatalog>>,
    lock: Option<Arc<dyn DistributedLock>>,
    cache: Arc<TableCache>,
    config: ProvisionerConfig,
    stats: Arc<ProvisionStats>,
    target: Result<Target, String>,
}

impl ShardTableProvisioner {
    /// Start building a provisioner.
    pub fn builder() -> ProvisionerBuilder {
        ProvisionerBuilder::default()
    }

    /// Expected shard table name, if the builder was complete.
    pub fn expected_table_name(&self) -> Option<&str> {
        self.target.as_ref().ok().map(|t| t.table.as_str())
    }

    /// Shared existence cache.
    pub fn cache(&self) -> &Arc<TableCache> {
        &self.cache
    }

    /// Shared statistics.
    pub fn stats(&self) -> &Arc<ProvisionStats> {
        &self.stats
    }

    /// Resolve the shard table, creating it if needed.
    pub fn table_name(&self) -> Result<String, ShardError> {
        self.table_name_with(&ResolveOptions::default())
    }

    /// Same as [`table_name`](Self::table_name), bounded by `options`.
    pub fn table_name_with(&self, options: &ResolveOptions) -> Result<String, ShardError> {
        let result = self.resolve(options);
        if result.is_err() {
            self.stats.record_failure();
        }
        result
    }

    fn resolve(&self, options: &ResolveOptions) -> Result<String, ShardError> {
        let (target, catalog, lock) = match (&self.target, &self.catalog, &self.lock) {
            (Ok(target), Some(catalog), Some(lock)) => (target, catalog, lock),
            (Err(reason), _, _) => return Err(ShardError::Configuration(reason.clone())),
            _ => {
                return Err(ShardError::Configuration(
                    "catalog and lock are required".to_string(),
                ))
            }
        };

        if self.cache.contains(&target.schema, &target.table) {
            debug!(
                "[shard-tables] cache hit for {}.{}",
                target.schema, target.table
            );
            self.stats.record_cache_hit();
            return Ok(target.table.clone());
        }

        let key = self.config.lock_key(&target.schema, &target.primary);
        let _guard = LockGuard::acquire(lock, key, &self.config, options, &self.stats)?;

        options.check(ProvisionStage::ExistenceCheck)?;
        let exists = catalog
            .table_exists(&target.schema, &target.table)
            .map_err(|source| {
                error!(
                    "[shard-tables] existence check failed for {}.{}: {}",
                    target.schema, target.table, source
                );
                ShardError::CatalogQuery {
                    schema: target.schema.clone(),
                    table: target.table.clone(),
                    source,
                }
            })?;

        if exists {
            debug!(
                "[shard-tables] {}.{} already exists",
                target.schema, target.table
            );
            self.stats.record_existing();
            self.cache.mark_existing(&target.schema, &target.table);
            return Ok(target.table.clone());
        }

        self.create(catalog.as_ref(), target, options)?;
        self.stats.record_created();
        self.cache.mark_existing(&target.schema, &target.table);
        Ok(target.table.clone())
    }

    fn create(
        &self,
        catalog: &dyn ShardCatalog,
        target: &Target,
        options: &ResolveOptions,
    ) -> Result<(), ShardError> {
        options.check(ProvisionStage::TemplateFetch)?;
        let template = catalog
            .create_statement(&target.schema, &target.primary)
            .map_err(|source| {
                error!(
                    "[shard-tables] template fetch failed for {}.{}: {}",
                    target.schema, target.primary, source
                );
                ShardError::CatalogQuery {
                    schema: target.schema.clone(),
                    table: target.primary.clone(),
                    source,
                }
            })?;

        let ddl = rewrite_create_statement(&template, &target.primary, &target.schema, &target.table)?;

        options.check(ProvisionStage::Create)?;
        catalog.execute(&ddl).map_err(|source| {
            error!(
                "[shard-tables] create failed for {}.{}: {}",
                target.schema, target.table, source
            );
            ShardError::DdlExecution {
                schema: target.schema.clone(),
                table: target.table.clone(),
                source,
            }
        })?;

        info!(
            "[shard-tables] created {}.{} from template {}",
            target.schema, target.table, target.primary
        );
        Ok(())
    }
}

impl std::fmt::Debug for ShardTableProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardTableProvisioner")
            .field("target", &self.target)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ShardTableProvisioner`].
#[derive(Default)]
pub struct ProvisionerBuilder {
    catalog: Option<Arc<dyn ShardCatalog>>,
    lock: Option<Arc<dyn DistributedLock>>,
    schema: Option<String>,
    primary: Option<String>,
    /// Wall-clock reading of the instant in its own zone.
    instant: Option<NaiveDateTime>,
    granularity: Option<Granularity>,
    cache: Option<Arc<TableCache>>,
    config: Option<ProvisionerConfig>,
    stats: Option<Arc<ProvisionStats>>,
}

impl ProvisionerBuilder {
    /// SQL catalog. Required.
    pub fn catalog(mut self, catalog: Arc<dyn ShardCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Creation lock. Required.
    pub fn lock(mut self, lock: Arc<dyn DistributedLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Schema holding the template and shard tables. Required.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Template table name. Required.
    pub fn primary(mut self, primary: impl Into<String>) -> Self {
        self.primary = Some(primary.into());
        self
    }

    /// Instant being written; bucketed in its own time zone. Required.
    pub fn instant<Tz: TimeZone>(mut self, instant: &DateTime<Tz>) -> Self {
        self.instant = Some(instant.naive_local());
        self
    }

    /// Sharding granularity. Required.
    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = Some(granularity);
        self
    }

    /// Existence cache to share with other provisioners. Defaults to a
    /// private, empty cache.
    pub fn cache(mut self, cache: Arc<TableCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Lock budget. Defaults to [`ProvisionerConfig::default`].
    pub fn config(mut self, config: ProvisionerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Statistics sink to share with other provisioners.
    pub fn stats(mut self, stats: Arc<ProvisionStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Finish building. Never fails; see [`ShardTableProvisioner`].
    pub fn build(self) -> ShardTableProvisioner {
        let config = self.config.unwrap_or_default();
        let target = Self::target(
            self.catalog.is_some(),
            self.lock.is_some(),
            self.schema,
            self.primary,
            self.instant,
            self.granularity,
            &config,
        );

        ShardTableProvisioner {
            catalog: self.catalog,
            lock: self.lock,
            cache: self.cache.unwrap_or_default(),
            config,
            stats: self.stats.unwrap_or_default(),
            target,
        }
    }

    fn target(
        has_catalog: bool,
        has_lock: bool,
        schema: Option<String>,
        primary: Option<String>,
        instant: Option<NaiveDateTime>,
        granularity: Option<Granularity>,
        config: &ProvisionerConfig,
    ) -> Result<Target, String> {
        if !has_catalog {
            return Err("catalog is required".to_string());
        }
        if !has_lock {
            return Err("lock is required".to_string());
        }
        let schema = schema.ok_or("schema is required")?;
        let primary = primary.ok_or("primary is required")?;
        let instant = instant.ok_or("instant is required")?;
        let granularity = granularity.ok_or("granularity is required")?;
        config.validate().map_err(|e| e.to_string())?;

        let table = format!("{}_{}", primary, instant.format(granularity.suffix_format()));
        for (field, name) in [("schema", &schema), ("primary", &primary), ("table", &table)] {
            invariant_valid_identifier(field, name).map_err(|e| e.to_string())?;
        }

        Ok(Target {
            schema,
            primary,
            table,
        })
    }
}
