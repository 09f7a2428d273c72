//! # redb-backed Catalog Storage
//!
//! A disk-backed item graph using the redb embedded database.
//!
//! - ACID transactions, one per mutation
//! - Crash safety (copy-on-write B-trees)
//! - Concurrent readers, single writer
//!
//! Component edges are keyed by `(parent, position)`, so a range scan over
//! one parent returns its edges in insertion order. `RedbCatalog` can be
//! used as the persistent backend of a [`Session`](crate::Session).

use crate::catalog::{
    Catalog, CatalogWriter, ItemGraphStore, SerializableCatalog, validate_edge,
    validate_new_item,
};
use crate::{BomError, ComponentEdge, Item, ItemId, ItemNode, JoinedComponent, NewItem};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use std::collections::BTreeMap;
use std::path::Path;

/// Table for items: ItemId(u64) -> serialized Item bytes
const ITEMS: TableDefinition<u64, &[u8]> = TableDefinition::new("items");

/// Table for component edges: (parent, position) -> (component, quantity)
const COMPONENTS: TableDefinition<(u64, u32), (u64, u32)> = TableDefinition::new("components");

/// Table for the unique name index: name -> ItemId(u64)
const NAME_INDEX: TableDefinition<&str, u64> = TableDefinition::new("name_index");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const LAST_ITEM_ID: &str = "last_item_id";

fn io_err(e: impl std::fmt::Display) -> BomError {
    BomError::IoError(e.to_string())
}

/// A disk-backed item graph using redb.
///
/// Keeps the name index in memory for duplicate detection and
/// `find_by_name`.
pub struct RedbCatalog {
    db: Database,
    /// In-memory copy of the name index.
    name_cache: BTreeMap<String, ItemId>,
    /// Highest id assigned so far.
    last_item_id: u64,
}

impl std::fmt::Debug for RedbCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbCatalog")
            .field("name_cache_size", &self.name_cache.len())
            .field("last_item_id", &self.last_item_id)
            .finish_non_exhaustive()
    }
}

impl RedbCatalog {
    /// Open or create a catalog database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BomError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(ITEMS).map_err(io_err)?;
            let _ = write_txn.open_table(COMPONENTS).map_err(io_err)?;
            let _ = write_txn.open_table(NAME_INDEX).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        let read_txn = db.begin_read().map_err(io_err)?;

        let last_item_id = {
            let table = read_txn.open_table(METADATA).map_err(io_err)?;
            table
                .get(LAST_ITEM_ID)
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0)
        };

        let name_cache = {
            let table = read_txn.open_table(NAME_INDEX).map_err(io_err)?;
            let mut cache = BTreeMap::new();
            for entry in table.iter().map_err(io_err)? {
                let (key, value) = entry.map_err(io_err)?;
                cache.insert(key.value().to_string(), ItemId(value.value()));
            }
            cache
        };

        tracing::debug!(items = name_cache.len(), last_item_id, "opened redb catalog");

        Ok(Self {
            db,
            name_cache,
            last_item_id,
        })
    }

    /// Highest id assigned so far.
    #[must_use]
    pub fn last_item_id(&self) -> u64 {
        self.last_item_id
    }

    /// Replace the whole catalog with a snapshot, in one transaction.
    ///
    /// The snapshot is first restored into an in-memory [`Catalog`], so
    /// both backends apply the same rules: item ids and per-parent edge
    /// order are preserved, a repeated `(parent, component)` edge keeps
    /// its first position and takes the last quantity, and edges that are
    /// dangling, zero-quantity or over the per-item limit are dropped.
    pub fn load_snapshot(&mut self, snapshot: &SerializableCatalog) -> Result<(), BomError> {
        let normalized = SerializableCatalog::from(&Catalog::from(snapshot.clone()));
        let mut names = BTreeMap::new();

        let write_txn = self.db.begin_write().map_err(io_err)?;
        write_txn.delete_table(ITEMS).map_err(io_err)?;
        write_txn.delete_table(COMPONENTS).map_err(io_err)?;
        write_txn.delete_table(NAME_INDEX).map_err(io_err)?;
        {
            let mut items_table = write_txn.open_table(ITEMS).map_err(io_err)?;
            let mut names_table = write_txn.open_table(NAME_INDEX).map_err(io_err)?;
            let mut edges_table = write_txn.open_table(COMPONENTS).map_err(io_err)?;
            let mut meta_table = write_txn.open_table(METADATA).map_err(io_err)?;

            for item in &normalized.items {
                let bytes = postcard::to_allocvec(item)
                    .map_err(|e| BomError::SerializationError(e.to_string()))?;
                items_table
                    .insert(item.id.0, bytes.as_slice())
                    .map_err(io_err)?;
                names_table
                    .insert(item.name.as_str(), item.id.0)
                    .map_err(io_err)?;
                names.insert(item.name.clone(), item.id);
            }

            let mut positions: BTreeMap<u64, u32> = BTreeMap::new();
            for &(parent, component, quantity) in &normalized.edges {
                let position = positions.entry(parent).or_insert(0);
                edges_table
                    .insert((parent, *position), (component, quantity))
                    .map_err(io_err)?;
                *position = position.saturating_add(1);
            }

            meta_table
                .insert(LAST_ITEM_ID, normalized.last_item_id)
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        tracing::debug!(
            items = normalized.items.len(),
            edges = normalized.edges.len(),
            "loaded snapshot into redb catalog"
        );

        // Update in-memory state only after successful commit.
        self.name_cache = names;
        self.last_item_id = normalized.last_item_id;
        Ok(())
    }

    fn contains(&self, id: ItemId) -> Result<bool, BomError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let items_table = read_txn.open_table(ITEMS).map_err(io_err)?;
        Ok(items_table.get(id.0).map_err(io_err)?.is_some())
    }

    /// Ordered edges of `parent` as `(position, edge)` within a write transaction.
    fn edges_in(
        write_txn: &WriteTransaction,
        parent: ItemId,
    ) -> Result<Vec<(u32, ComponentEdge)>, BomError> {
        let edges_table = write_txn.open_table(COMPONENTS).map_err(io_err)?;
        let mut edges = Vec::new();
        for entry in edges_table
            .range((parent.0, 0u32)..=(parent.0, u32::MAX))
            .map_err(io_err)?
        {
            let (key, value) = entry.map_err(io_err)?;
            let (_parent, position) = key.value();
            let (component, quantity) = value.value();
            edges.push((position, ComponentEdge::new(ItemId(component), quantity)));
        }
        Ok(edges)
    }
}

fn decode_item(bytes: &[u8]) -> Result<Item, BomError> {
    postcard::from_bytes(bytes).map_err(|e| BomError::DeserializationError(e.to_string()))
}

// =============================================================================
// STORE TRAIT IMPLEMENTATIONS
// =============================================================================

impl ItemGraphStore for RedbCatalog {
    fn lookup(&self, id: ItemId) -> Result<Option<ItemNode>, BomError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let items_table = read_txn.open_table(ITEMS).map_err(io_err)?;
        let edges_table = read_txn.open_table(COMPONENTS).map_err(io_err)?;

        let item = match items_table.get(id.0).map_err(io_err)? {
            Some(data) => decode_item(data.value())?,
            None => return Ok(None),
        };

        let mut components = Vec::new();
        for entry in edges_table
            .range((id.0, 0u32)..=(id.0, u32::MAX))
            .map_err(io_err)?
        {
            let (_, value) = entry.map_err(io_err)?;
            let (component, quantity) = value.value();
            let joined = match items_table.get(component).map_err(io_err)? {
                Some(data) => Some(decode_item(data.value())?),
                None => None,
            };
            components.push(JoinedComponent {
                edge: ComponentEdge::new(ItemId(component), quantity),
                item: joined,
            });
        }

        Ok(Some(ItemNode { item, components }))
    }

    fn item(&self, id: ItemId) -> Result<Option<Item>, BomError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let items_table = read_txn.open_table(ITEMS).map_err(io_err)?;
        match items_table.get(id.0).map_err(io_err)? {
            Some(data) => Ok(Some(decode_item(data.value())?)),
            None => Ok(None),
        }
    }

    fn find_by_name(&self, name: &str) -> Result<Option<ItemId>, BomError> {
        Ok(self.name_cache.get(name).copied())
    }

    fn items(&self) -> Result<Vec<Item>, BomError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let items_table = read_txn.open_table(ITEMS).map_err(io_err)?;

        let mut items = Vec::new();
        for entry in items_table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            items.push(decode_item(value.value())?);
        }
        Ok(items)
    }

    fn item_count(&self) -> Result<usize, BomError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let items_table = read_txn.open_table(ITEMS).map_err(io_err)?;
        let count = items_table.len().map_err(io_err)?;
        Ok(count as usize)
    }

    fn edge_count(&self) -> Result<usize, BomError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let edges_table = read_txn.open_table(COMPONENTS).map_err(io_err)?;
        let count = edges_table.len().map_err(io_err)?;
        Ok(count as usize)
    }
}

impl CatalogWriter for RedbCatalog {
    fn insert_item(&mut self, item: NewItem) -> Result<ItemId, BomError> {
        validate_new_item(&item)?;

        if let Some(&existing) = self.name_cache.get(&item.name) {
            return Ok(existing);
        }

        let id = ItemId(self.last_item_id.saturating_add(1));
        let name = item.name.clone();
        let bytes = postcard::to_allocvec(&item.into_item(id))
            .map_err(|e| BomError::SerializationError(e.to_string()))?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut items_table = write_txn.open_table(ITEMS).map_err(io_err)?;
            items_table.insert(id.0, bytes.as_slice()).map_err(io_err)?;
        }
        {
            let mut names_table = write_txn.open_table(NAME_INDEX).map_err(io_err)?;
            names_table.insert(name.as_str(), id.0).map_err(io_err)?;
        }
        {
            let mut meta_table = write_txn.open_table(METADATA).map_err(io_err)?;
            meta_table.insert(LAST_ITEM_ID, id.0).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        self.last_item_id = id.0;
        self.name_cache.insert(name, id);
        Ok(id)
    }

    fn set_component(
        &mut self,
        parent: ItemId,
        component: ItemId,
        quantity: u32,
    ) -> Result<(), BomError> {
        let parent_exists = self.contains(parent)?;
        let component_exists = self.contains(component)?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        let edges = Self::edges_in(&write_txn, parent)?;
        let existing = edges
            .iter()
            .find(|(_, edge)| edge.component == component)
            .map(|(position, _)| *position);

        validate_edge(
            parent,
            component,
            quantity,
            parent_exists,
            component_exists,
            if existing.is_some() { 0 } else { edges.len() },
        )?;

        let position = match existing {
            Some(position) => position,
            None => edges
                .last()
                .map_or(0, |(position, _)| position.saturating_add(1)),
        };
        {
            let mut edges_table = write_txn.open_table(COMPONENTS).map_err(io_err)?;
            edges_table
                .insert((parent.0, position), (component.0, quantity))
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::MAX_COMPONENTS_PER_ITEM;
    use crate::{Credits, Resolver};
    use tempfile::tempdir;

    fn priced(name: &str, cost: u64) -> NewItem {
        NewItem::new(name).with_cost(Credits::from_units(cost))
    }

    #[test]
    fn basic_operations() {
        let temp = tempdir().expect("temp dir");
        let mut catalog = RedbCatalog::open(temp.path().join("test.redb")).expect("open db");

        let frame = catalog.insert_item(priced("Frame", 10)).expect("insert");
        let bolt = catalog.insert_item(priced("Bolt", 1)).expect("insert");
        catalog.set_component(frame, bolt, 4).expect("edge");

        assert_eq!(frame, ItemId(1));
        assert_eq!(bolt, ItemId(2));
        assert_eq!(catalog.item_count().expect("count"), 2);
        assert_eq!(catalog.edge_count().expect("count"), 1);
    }

    #[test]
    fn duplicate_name_returns_existing_id() {
        let temp = tempdir().expect("temp dir");
        let mut catalog = RedbCatalog::open(temp.path().join("test.redb")).expect("open db");

        let first = catalog.insert_item(priced("Bolt", 1)).expect("insert");
        let second = catalog.insert_item(priced("Bolt", 99)).expect("insert");

        assert_eq!(first, second);
        let stored = catalog.item(first).expect("item").expect("exists");
        assert_eq!(stored.base_cost, Credits::from_units(1));
    }

    #[test]
    fn lookup_keeps_edge_order_and_upserts_in_place() {
        let temp = tempdir().expect("temp dir");
        let mut catalog = RedbCatalog::open(temp.path().join("test.redb")).expect("open db");

        let frame = catalog.insert_item(priced("Frame", 10)).expect("insert");
        let plate = catalog.insert_item(priced("Plate", 2)).expect("insert");
        let bolt = catalog.insert_item(priced("Bolt", 1)).expect("insert");
        catalog.set_component(frame, plate, 2).expect("edge");
        catalog.set_component(frame, bolt, 4).expect("edge");
        catalog.set_component(frame, plate, 3).expect("edge");

        let node = catalog.lookup(frame).expect("lookup").expect("exists");
        let edges: Vec<_> = node
            .components
            .iter()
            .map(|c| (c.edge.component, c.edge.quantity))
            .collect();
        assert_eq!(edges, vec![(plate, 3), (bolt, 4)]);
        assert_eq!(
            node.components[1].item.as_ref().map(|i| i.name.as_str()),
            Some("Bolt")
        );
        assert_eq!(catalog.edge_count().expect("count"), 2);
    }

    #[test]
    fn invalid_edges_rejected() {
        let temp = tempdir().expect("temp dir");
        let mut catalog = RedbCatalog::open(temp.path().join("test.redb")).expect("open db");
        let frame = catalog.insert_item(priced("Frame", 10)).expect("insert");

        assert!(catalog.set_component(frame, ItemId(42), 1).is_err());
        assert!(catalog.set_component(frame, frame, 0).is_err());
        assert_eq!(catalog.edge_count().expect("count"), 0);
    }

    #[test]
    fn persistence_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        let (frame, bolt) = {
            let mut catalog = RedbCatalog::open(&db_path).expect("open db");
            let frame = catalog.insert_item(priced("Frame", 10)).expect("insert");
            let bolt = catalog.insert_item(priced("Bolt", 1)).expect("insert");
            catalog.set_component(frame, bolt, 4).expect("edge");
            (frame, bolt)
        };

        let mut catalog = RedbCatalog::open(&db_path).expect("reopen db");
        assert_eq!(catalog.item_count().expect("count"), 2);
        assert_eq!(catalog.find_by_name("Bolt").expect("find"), Some(bolt));
        assert_eq!(catalog.last_item_id(), 2);

        let washer = catalog.insert_item(priced("Washer", 1)).expect("insert");
        assert_eq!(washer, ItemId(3));

        let result = Resolver::new(&catalog).resolve(frame).expect("resolve");
        assert_eq!(result.total_cost, Credits::from_units(14));
    }

    #[test]
    fn load_snapshot_replaces_contents() {
        let temp = tempdir().expect("temp dir");
        let mut catalog = RedbCatalog::open(temp.path().join("test.redb")).expect("open db");
        catalog.insert_item(priced("Stale", 1)).expect("insert");

        let mut source = Catalog::new();
        let kit = source.insert_item(priced("Kit", 5)).expect("insert");
        let nut = source.insert_item(priced("Nut", 1)).expect("insert");
        source.set_component(kit, nut, 8).expect("edge");
        let mut snapshot = SerializableCatalog::from(&source);
        snapshot.edges.push((kit.0, 77, 1));

        catalog.load_snapshot(&snapshot).expect("load");

        assert_eq!(catalog.item_count().expect("count"), 2);
        assert_eq!(catalog.edge_count().expect("count"), 1);
        assert_eq!(catalog.find_by_name("Stale").expect("find"), None);
        assert_eq!(catalog.find_by_name("Nut").expect("find"), Some(nut));
        assert_eq!(SerializableCatalog::from_store(&catalog).expect("export").edges.len(), 1);
    }

    #[test]
    fn unknown_lookup_returns_none() {
        let temp = tempdir().expect("temp dir");
        let catalog = RedbCatalog::open(temp.path().join("test.redb")).expect("open db");
        assert!(catalog.lookup(ItemId(1)).expect("lookup").is_none());
        assert!(catalog.item(ItemId(1)).expect("item").is_none());
    }

    #[test]
    fn load_snapshot_matches_in_memory_restore() {
        let mut source = Catalog::new();
        let kit = source.insert_item(priced("Kit", 0)).expect("insert");
        let nut = source.insert_item(priced("Nut", 1)).expect("insert");
        let mut snapshot = SerializableCatalog::from(&source);
        snapshot.edges.push((kit.0, nut.0, 2));
        snapshot.edges.push((kit.0, nut.0, 2));

        let temp = tempdir().expect("temp dir");
        let mut persistent = RedbCatalog::open(temp.path().join("test.redb")).expect("open db");
        persistent.load_snapshot(&snapshot).expect("load");
        let volatile = Catalog::from(snapshot);

        let from_disk = Resolver::new(&persistent).resolve(kit).expect("resolve");
        let from_memory = Resolver::new(&volatile).resolve(kit).expect("resolve");
        assert_eq!(from_disk.total_cost, Credits::from_units(2));
        assert_eq!(from_disk, from_memory);
        assert_eq!(persistent.edge_count().expect("count"), 1);
    }

    #[test]
    fn load_snapshot_enforces_component_limit() {
        let mut source = Catalog::new();
        let kit = source.insert_item(priced("Kit", 0)).expect("insert");
        let parts: Vec<ItemId> = (0..=MAX_COMPONENTS_PER_ITEM)
            .map(|i| source.insert_item(priced(&format!("Part {}", i), 1)).expect("insert"))
            .collect();
        let mut snapshot = SerializableCatalog::from(&source);
        snapshot
            .edges
            .extend(parts.iter().map(|part| (kit.0, part.0, 1)));

        let temp = tempdir().expect("temp dir");
        let mut catalog = RedbCatalog::open(temp.path().join("test.redb")).expect("open db");
        catalog.load_snapshot(&snapshot).expect("load");

        assert_eq!(catalog.edge_count().expect("count"), MAX_COMPONENTS_PER_ITEM);
        let node = catalog.lookup(kit).expect("lookup").expect("exists");
        assert_eq!(node.components[0].edge.component, parts[0]);
    }
}
