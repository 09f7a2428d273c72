//! # Session Module
//!
//! A catalog behind one of two storage backends, plus the resolve options
//! used for every query made through it.
//!
//! ## Storage Backends
//!
//! - `InMemory`: uses the in-memory `Catalog` (fast, volatile unless saved
//!   as a snapshot)
//! - `Persistent`: uses `RedbCatalog` for disk-backed ACID storage

use crate::catalog::{CatalogWriter, ItemGraphStore, SerializableCatalog};
use crate::resolver::{ResolveOptions, Resolver};
use crate::seeder::{SeedRecord, SeedReport};
use crate::storage::RedbCatalog;
use crate::{BomError, Catalog, CraftingResult, Item, ItemId, ItemNode, NewItem};
use std::path::Path;

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory catalog (fast, volatile).
    InMemory(Catalog),
    /// Disk-backed catalog using redb (ACID, persistent).
    Persistent(RedbCatalog),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(Catalog::new())
    }
}

// NOTE: StorageBackend does NOT implement Clone.
// A redb database handle cannot be cloned.

/// A catalog session.
#[derive(Debug, Default)]
pub struct Session {
    backend: StorageBackend,
    options: ResolveOptions,
}

impl Session {
    /// Create a new empty session with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session over an existing in-memory catalog.
    #[must_use]
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            backend: StorageBackend::InMemory(catalog),
            options: ResolveOptions::default(),
        }
    }

    /// Create a session with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path.
    /// All changes are persisted to disk as they are made.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, BomError> {
        let redb = RedbCatalog::open(path)?;
        Ok(Self::with_redb_catalog(redb))
    }

    /// Create a session over an already opened `RedbCatalog`.
    #[must_use]
    pub fn with_redb_catalog(redb: RedbCatalog) -> Self {
        Self {
            backend: StorageBackend::Persistent(redb),
            options: ResolveOptions::default(),
        }
    }

    /// Replace the resolve options used by [`Session::resolve`].
    #[must_use]
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Current resolve options.
    #[must_use]
    pub fn options(&self) -> ResolveOptions {
        self.options
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// The in-memory catalog, or `None` for persistent backends.
    ///
    /// # Example
    /// ```
    /// use bomcraft_core::Session;
    ///
    /// let session = Session::new();
    /// assert!(session.catalog_opt().is_some());
    /// ```
    #[must_use]
    pub fn catalog_opt(&self) -> Option<&Catalog> {
        match &self.backend {
            StorageBackend::InMemory(c) => Some(c),
            StorageBackend::Persistent(_) => None,
        }
    }

    // =========================================================================
    // HIGH-LEVEL OPERATIONS
    // =========================================================================

    /// Resolve the crafting requirements of one unit of `root`.
    pub fn resolve(&self, root: ItemId) -> Result<CraftingResult, BomError> {
        match &self.backend {
            StorageBackend::InMemory(c) => Resolver::with_options(c, self.options).resolve(root),
            StorageBackend::Persistent(r) => Resolver::with_options(r, self.options).resolve(root),
        }
    }

    /// Seed the catalog from spreadsheet records.
    pub fn seed(&mut self, records: &[SeedRecord]) -> Result<SeedReport, BomError> {
        match &mut self.backend {
            StorageBackend::InMemory(c) => crate::seeder::seed(c, records),
            StorageBackend::Persistent(r) => crate::seeder::seed(r, records),
        }
    }

    /// Serializable copy of the whole catalog.
    pub fn export_snapshot(&self) -> Result<SerializableCatalog, BomError> {
        match &self.backend {
            StorageBackend::InMemory(c) => Ok(SerializableCatalog::from(c)),
            StorageBackend::Persistent(r) => SerializableCatalog::from_store(r),
        }
    }

    /// Replace the whole catalog with a snapshot.
    pub fn import_snapshot(&mut self, snapshot: SerializableCatalog) -> Result<(), BomError> {
        match &mut self.backend {
            StorageBackend::InMemory(c) => {
                *c = Catalog::from(snapshot);
                Ok(())
            }
            StorageBackend::Persistent(r) => r.load_snapshot(&snapshot),
        }
    }
}

// =============================================================================
// STORE DELEGATION
// =============================================================================

impl ItemGraphStore for Session {
    fn lookup(&self, id: ItemId) -> Result<Option<ItemNode>, BomError> {
        match &self.backend {
            StorageBackend::InMemory(c) => c.lookup(id),
            StorageBackend::Persistent(r) => r.lookup(id),
        }
    }

    fn item(&self, id: ItemId) -> Result<Option<Item>, BomError> {
        match &self.backend {
            StorageBackend::InMemory(c) => c.item(id),
            StorageBackend::Persistent(r) => r.item(id),
        }
    }

    fn find_by_name(&self, name: &str) -> Result<Option<ItemId>, BomError> {
        match &self.backend {
            StorageBackend::InMemory(c) => c.find_by_name(name),
            StorageBackend::Persistent(r) => r.find_by_name(name),
        }
    }

    fn items(&self) -> Result<Vec<Item>, BomError> {
        match &self.backend {
            StorageBackend::InMemory(c) => c.items(),
            StorageBackend::Persistent(r) => r.items(),
        }
    }

    fn item_count(&self) -> Result<usize, BomError> {
        match &self.backend {
            StorageBackend::InMemory(c) => c.item_count(),
            StorageBackend::Persistent(r) => r.item_count(),
        }
    }

    fn edge_count(&self) -> Result<usize, BomError> {
        match &self.backend {
            StorageBackend::InMemory(c) => c.edge_count(),
            StorageBackend::Persistent(r) => r.edge_count(),
        }
    }
}

impl CatalogWriter for Session {
    fn insert_item(&mut self, item: NewItem) -> Result<ItemId, BomError> {
        match &mut self.backend {
            StorageBackend::InMemory(c) => c.insert_item(item),
            StorageBackend::Persistent(r) => r.insert_item(item),
        }
    }

    fn set_component(
        &mut self,
        parent: ItemId,
        component: ItemId,
        quantity: u32,
    ) -> Result<(), BomError> {
        match &mut self.backend {
            StorageBackend::InMemory(c) => c.set_component(parent, component, quantity),
            StorageBackend::Persistent(r) => r.set_component(parent, component, quantity),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
