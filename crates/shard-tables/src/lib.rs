//! # Shard Tables
//!
//! Time-sharded table resolution and on-demand shard table provisioning.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Rows of a logical table (the *primary*) are stored in physical tables
//! named `<primary>_<suffix>`, one per calendar bucket:
//!
//! | Granularity | Code | Suffix       | Example               |
//! |-------------|------|--------------|-----------------------|
//! | Hour        | 10   | `YYYYMMDDHH` | `driver_hour_2025081917` |
//! | Day         | 20   | `YYYYMMDD`   | `orders_20240315`     |
//! | Month       | 30   | `YYYYMM`     | `orders_202403`       |
//! | Year        | 40   | `YYYY`       | `orders_2024`         |
//!
//! - **Read path:** [`split_range`] maps a query interval to one range per
//!   shard table. Pure, no I/O.
//! - **Write path:** [`ShardTableProvisioner`] resolves the table for an
//!   instant and creates it from the template table when missing, under a
//!   cross-process lock, with a process-local existence cache in front.
//!
//! ## Module Structure
//!
//! ```text
//! shard-tables/
//! ├── domain/          # Granularity, requests, ranges, errors, invariants
//! ├── algorithms/      # Interval splitting, template DDL rewriting
//! ├── ports/           # API trait + catalog and lock traits
//! ├── service/         # Provisioner, cache, lock guard, stats
//! ├── adapters/        # In-memory catalog/lock, file lock
//! └── config.rs        # Lock budget
//! ```
//!
//! ## Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use shard_tables::{split_range, Granularity, ShardRequest};
//!
//! let request = ShardRequest::new(
//!     "orders",
//!     Utc.with_ymd_and_hms(2024, 12, 31, 22, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2025, 1, 1, 2, 0, 0).unwrap(),
//!     false,
//!     Granularity::Year,
//! );
//! let tables: Vec<_> = split_range(&request)
//!     .unwrap()
//!     .into_iter()
//!     .map(|r| r.table_name)
//!     .collect();
//! assert_eq!(tables, ["orders_2024", "orders_2025"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{FileLock, FileLockError, InMemoryCatalog, InMemoryLock};
pub use algorithms::{rewrite_create_statement, split_range, tables_for_range};
pub use config::{BackoffStrategy, ProvisionerConfig};
pub use domain::{
    invariant_contiguous_coverage, invariant_distinct_tables, invariant_valid_identifier,
    BackendError, Granularity, GranularitySpec, ProvisionRequest, ProvisionStage,
    RawShardRequest, ShardError, ShardRequest, ShardRequestBuilder, TimeRange,
    MAX_IDENTIFIER_LEN,
};
pub use ports::{DistributedLock, ShardCatalog, ShardTableApi};
pub use service::{
    CancelFlag, LockGuard, ProvisionStats, ProvisionStatsSnapshot, ProvisionerBuilder,
    ResolveOptions, ShardTableProvisioner, ShardTableService, TableCache,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
