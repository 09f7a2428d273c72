//! # bomcraft-core
//!
//! The crafting-requirements engine for bomcraft - THE LOGIC.
//!
//! Given an item and a catalog of "requires N of" component edges, this
//! crate computes the exact credit cost, active minutes and downtime of
//! one unit, the ordered intermediate crafting steps, and a flattened
//! base-component breakdown.
//!
//! ## Layout
//!
//! - `types` / `money`: the data model and the exact [`Credits`] type
//! - `catalog`: the store traits and the in-memory [`Catalog`]
//! - `storage`: the redb-backed [`RedbCatalog`]
//! - `resolver` / `assembly`: the recursive expansion and its output
//! - `seeder`: catalog construction from spreadsheet records
//! - `formats`: the binary snapshot format
//! - `session`: one catalog behind either backend
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies
//! - `BTreeMap` only, no floats: two resolves of the same catalog are identical
//! - The resolver only reads; data anomalies are reported, never fatal

// =============================================================================
// MODULES
// =============================================================================

pub mod assembly;
pub mod catalog;
pub mod formats;
pub mod money;
pub mod primitives;
pub mod resolver;
pub mod seeder;
pub mod session;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use money::Credits;
pub use types::{
    BomError, ComponentEdge, Item, ItemDetails, ItemId, ItemNode, JoinedComponent, NewItem,
};

// =============================================================================
// RE-EXPORTS: Catalog & Resolver
// =============================================================================

pub use assembly::{BreakdownEntry, ComponentRef, CraftingResult, CraftingStep};
pub use catalog::{Catalog, CatalogWriter, ItemGraphStore, SerializableCatalog};
pub use resolver::{
    Anomaly, Intermediate, ResolveContext, ResolveOptions, Resolver,
    calculate_crafting_requirements,
};
pub use seeder::{SeedRecord, SeedReport};
pub use session::{Session, StorageBackend};
pub use storage::RedbCatalog;

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{SnapshotHeader, catalog_from_bytes, catalog_to_bytes, snapshot_from_bytes};
