//! In-memory SQL catalog.
//!
//! Implements `ShardCatalog` for tests and embedders without a database.
//! Executed `CREATE TABLE` statements register the created table, so a
//! provisioner sees its own work on the next existence check.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::algorithms::created_table;
use crate::domain::BackendError;
use crate::ports::outbound::ShardCatalog;

/// In-memory catalog: `(schema, table) -> CREATE TABLE text`.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    tables: RwLock<HashMap<(String, String), String>>,
    executed: RwLock<Vec<String>>,
    exists_calls: AtomicU64,
    fail_lookups: AtomicU32,
    fail_executes: AtomicU32,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table (typically a template) with its DDL.
    pub fn add_table(&self, schema: &str, table: &str, ddl: impl Into<String>) {
        self.tables
            .write()
            .insert((schema.to_string(), table.to_string()), ddl.into());
    }

    /// Whether `schema.table` exists.
    pub fn contains_table(&self, schema: &str, table: &str) -> bool {
        self.tables
            .read()
            .contains_key(&(schema.to_string(), table.to_string()))
    }

    /// Number of tables across all schemas.
    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }

    /// Statements successfully executed, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.read().clone()
    }

    /// Number of statements successfully executed.
    pub fn execute_count(&self) -> usize {
        self.executed.read().len()
    }

    /// Number of existence checks served.
    pub fn exists_count(&self) -> u64 {
        self.exists_calls.load(Ordering::SeqCst)
    }

    /// Fail the next `n` existence checks and template fetches.
    pub fn fail_next_lookups(&self, n: u32) {
        self.fail_lookups.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` executions.
    pub fn fail_next_executes(&self, n: u32) {
        self.fail_executes.store(n, Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl ShardCatalog for InMemoryCatalog {
    fn table_exists(&self, schema: &str, table: &str) -> Result<bool, BackendError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.fail_lookups) {
            return Err(BackendError::new("injected lookup failure"));
        }
        Ok(self.contains_table(schema, table))
    }

    fn create_statement(&self, schema: &str, template: &str) -> Result<String, BackendError> {
        if Self::take_failure(&self.fail_lookups) {
            return Err(BackendError::new("injected lookup failure"));
        }
        self.tables
            .read()
            .get(&(schema.to_string(), template.to_string()))
            .cloned()
            .ok_or_else(|| BackendError::new(format!("Table '{}.{}' doesn't exist", schema, template)))
    }

    fn execute(&self, ddl: &str) -> Result<(), BackendError> {
        if Self::take_failure(&self.fail_executes) {
            return Err(BackendError::new("injected execute failure"));
        }

        let (schema, table) = match created_table(ddl) {
            Some((Some(schema), table)) => (schema, table),
            Some((None, _)) => return Err(BackendError::new("No database selected")),
            None => return Err(BackendError::new("only CREATE TABLE is supported")),
        };

        {
            let mut tables = self.tables.write();
            let key = (schema, table);
            if tables.contains_key(&key) {
                return Err(BackendError::new(format!(
                    "Table '{}.{}' already exists",
                    key.0, key.1
                )));
            }
            debug!("[shard-tables] in-memory catalog created {}.{}", key.0, key.1);
            tables.insert(key, ddl.to_string());
        }
        self.executed.write().push(ddl.to_string());
        Ok(())
    }
}
