//! Cross-module integration tests.

pub mod concurrent_provisioning;
pub mod deadlines;
pub mod multi_process;
pub mod split_flows;
