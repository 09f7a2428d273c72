//! # Persistent Storage
//!
//! Disk-backed implementations of the catalog store traits.

mod redb_catalog;

pub use redb_catalog::RedbCatalog;
