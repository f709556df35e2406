//! # Domain Module
//!
//! Core types for shard table resolution: granularity, requests, ranges,
//! errors and the rules split results must obey.

pub mod errors;
pub mod granularity;
pub mod invariants;
pub mod value_objects;

pub use errors::*;
pub use granularity::*;
pub use invariants::*;
pub use value_objects::*;
