//! Process-local record of shard tables known to exist.
//!
//! Entries are only added after the catalog confirmed the table or the
//! provisioner created it, so a hit is never a false positive. A miss only
//! costs a lock-protected re-check. Entries are never evicted.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

/// Existence cache keyed on `(schema, table)`.
#[derive(Debug, Default)]
pub struct TableCache {
    /// schema -> tables confirmed in that schema
    entries: RwLock<HashMap<String, HashSet<String>>>,
}

impl TableCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `schema.table` is known to exist.
    pub fn contains(&self, schema: &str, table: &str) -> bool {
        self.entries
            .read()
            .get(schema)
            .map_or(false, |tables| tables.contains(table))
    }

    /// Record that `schema.table` exists.
    pub fn mark_existing(&self, schema: &str, table: &str) {
        let mut entries = self.entries.write();
        match entries.get_mut(schema) {
            Some(tables) => {
                tables.insert(table.to_string());
            }
            None => {
                entries.insert(schema.to_string(), HashSet::from([table.to_string()]));
            }
        }
    }

    /// Number of cached tables across all schemas.
    pub fn len(&self) -> usize {
        self.entries.read().values().map(HashSet::len).sum()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
