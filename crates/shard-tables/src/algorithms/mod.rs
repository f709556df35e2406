//! # Algorithms Module
//!
//! Pure shard computations: interval splitting and template DDL rewriting.

pub mod ddl;
pub mod time_split;

pub use ddl::{created_table, qualified_name, quote_identifier, rewrite_create_statement};
pub use time_split::{split_range, tables_for_range};
