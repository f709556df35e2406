//! # Ports Module
//!
//! Inbound API trait and outbound backend traits.

pub mod inbound;
pub mod outbound;

pub use inbound::ShardTableApi;
pub use outbound::{DistributedLock, ShardCatalog};
