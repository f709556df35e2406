//! # Outbound Ports
//!
//! Backends the provisioner depends on: a SQL catalog that can inspect and
//! create tables, and a lock service shared by every process that may create
//! shard tables.
//!
//! Both ports are synchronous; calls block the calling thread.

use std::time::Duration;

use crate::domain::BackendError;

/// SQL catalog - outbound port.
///
/// Production: a MySQL-compatible connection pool (`information_schema`
/// lookup, `SHOW CREATE TABLE`, plain DDL execution).
/// Testing: [`crate::adapters::InMemoryCatalog`].
pub trait ShardCatalog: Send + Sync {
    /// Whether `schema.table` exists.
    fn table_exists(&self, schema: &str, table: &str) -> Result<bool, BackendError>;

    /// `CREATE TABLE` statement of the template table `schema.template`.
    fn create_statement(&self, schema: &str, template: &str) -> Result<String, BackendError>;

    /// Execute a DDL statement.
    fn execute(&self, ddl: &str) -> Result<(), BackendError>;
}

/// Cross-process lock with a time-to-live - outbound port.
///
/// Production: Redis `SET key token NX PX ttl`, or [`crate::adapters::FileLock`]
/// for processes sharing a filesystem.
/// Testing: [`crate::adapters::InMemoryLock`].
pub trait DistributedLock: Send + Sync {
    /// Single non-blocking attempt to take `key`.
    ///
    /// Returns `Ok(true)` when the key was free (or expired) and is now held
    /// under `token` for `ttl`, `Ok(false)` when another holder has it.
    fn acquire_if_absent(&self, key: &str, token: &str, ttl: Duration)
        -> Result<bool, BackendError>;

    /// Release `key` if it is still held under `token`.
    ///
    /// Best-effort: the TTL bounds how long a lost release keeps the key.
    fn release(&self, key: &str, token: &str) -> Result<(), BackendError>;
}
