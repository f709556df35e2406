//! # Shard Tables Test Suite
//!
//! Integration tests exercising the splitter, provisioner and adapters
//! together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs                 # Shared backends and template DDL
//! └── integration/
//!     ├── concurrent_provisioning.rs  # Many threads, one service
//!     ├── multi_process.rs            # Independent services, shared FileLock
//!     ├── deadlines.rs                # Deadline and cancellation
//!     └── split_flows.rs              # Read path against provisioned tables
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p shard-tables-tests
//!
//! # With provisioning logs
//! SHARD_LOG_LEVEL=debug cargo test -p shard-tables-tests -- --nocapture
//! ```

pub mod fixtures;
pub mod integration;

use tracing_subscriber::EnvFilter;

/// Install a test subscriber once per process.
///
/// Filter from `SHARD_LOG_LEVEL`, then `RUST_LOG`, default `info`. Later
/// calls are no-ops.
pub fn init_test_tracing() {
    let filter = std::env::var("SHARD_LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
