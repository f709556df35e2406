//! # Adapters Module
//!
//! Port implementations shipped with the crate.
//!
//! - `InMemoryCatalog`, `InMemoryLock`: single-process backends for tests
//!   and embedders
//! - `FileLock`: cross-process lock over a shared directory

pub mod file_lock;
pub mod memory_catalog;
pub mod memory_lock;

pub use file_lock::{FileLock, FileLockError};
pub use memory_catalog::InMemoryCatalog;
pub use memory_lock::InMemoryLock;
