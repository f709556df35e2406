//! # Inbound Ports
//!
//! API trait defining what the shard table subsystem can do.

use chrono::TimeZone;

use crate::domain::{ProvisionRequest, ShardError, ShardRequest, TimeRange};

/// Shard table API - inbound port.
pub trait ShardTableApi: Send + Sync {
    /// Split a query interval into per-shard ranges. Pure; no I/O.
    fn split_range<Tz: TimeZone>(
        &self,
        request: &ShardRequest<Tz>,
    ) -> Result<Vec<TimeRange<Tz>>, ShardError>;

    /// Resolve the shard table for an instant, creating it from the template
    /// table when it does not exist yet.
    fn resolve_and_provision_table<Tz: TimeZone>(
        &self,
        request: &ProvisionRequest<Tz>,
    ) -> Result<String, ShardError>;
}
