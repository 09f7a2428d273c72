//! # Item Graph Store
//!
//! The catalog of items and their "requires N of" component edges.
//!
//! This module defines the `ItemGraphStore` read contract consumed by the
//! resolver, the `CatalogWriter` contract used by seeding and import, and
//! the in-memory `Catalog` implementing both.
//! All maps are `BTreeMap` for deterministic ordering; component edges are
//! kept in insertion order because step numbering depends on it.

use crate::primitives::{MAX_COMPONENTS_PER_ITEM, MAX_NAME_LENGTH};
use crate::{BomError, ComponentEdge, Item, ItemId, ItemNode, JoinedComponent, NewItem};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// STORE TRAITS
// =============================================================================

/// Read-only point lookups over the item graph.
///
/// Unknown ids yield `Ok(None)`, never an error. `Err` is reserved for
/// storage failures so that both in-memory and persistent backends share
/// one signature.
pub trait ItemGraphStore {
    /// Lookup an item with its ordered component edges, each joined with
    /// the component's own scalar fields.
    fn lookup(&self, id: ItemId) -> Result<Option<ItemNode>, BomError>;

    /// Lookup an item's scalar fields only.
    fn item(&self, id: ItemId) -> Result<Option<Item>, BomError>;

    /// Find an item id by its exact name.
    fn find_by_name(&self, name: &str) -> Result<Option<ItemId>, BomError>;

    /// All items in ascending id order.
    fn items(&self) -> Result<Vec<Item>, BomError>;

    /// Get the total number of items.
    fn item_count(&self) -> Result<usize, BomError>;

    /// Get the total number of component edges.
    fn edge_count(&self) -> Result<usize, BomError>;
}

/// Mutations used to build a catalog.
pub trait CatalogWriter {
    /// Insert an item. Names are unique: inserting a name that already
    /// exists leaves the stored item untouched and returns its id.
    fn insert_item(&mut self, item: NewItem) -> Result<ItemId, BomError>;

    /// Insert or update the edge `parent requires quantity of component`.
    ///
    /// An existing edge keeps its position and takes the new quantity.
    fn set_component(
        &mut self,
        parent: ItemId,
        component: ItemId,
        quantity: u32,
    ) -> Result<(), BomError>;
}

// =============================================================================
// VALIDATION (shared by every backend)
// =============================================================================

/// Validate the scalar fields of an item before it is stored.
pub(crate) fn validate_new_item(item: &NewItem) -> Result<(), BomError> {
    let name = item.name.trim();
    if name.is_empty() {
        return Err(BomError::InvalidItem("name must not be empty".to_string()));
    }
    if item.name.len() > MAX_NAME_LENGTH {
        return Err(BomError::InvalidItem(format!(
            "name exceeds {} bytes",
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Validate an edge against the store's current contents.
pub(crate) fn validate_edge(
    parent: ItemId,
    component: ItemId,
    quantity: u32,
    parent_exists: bool,
    component_exists: bool,
    existing_edges: usize,
) -> Result<(), BomError> {
    let reject = |reason: &str| BomError::InvalidEdge {
        parent,
        component,
        reason: reason.to_string(),
    };

    if quantity == 0 {
        return Err(reject("quantity must be at least 1"));
    }
    if !parent_exists {
        return Err(reject("parent item does not exist"));
    }
    if !component_exists {
        return Err(reject("component item does not exist"));
    }
    if existing_edges >= MAX_COMPONENTS_PER_ITEM {
        return Err(reject("too many components on one item"));
    }
    Ok(())
}

// =============================================================================
// IN-MEMORY CATALOG
// =============================================================================

/// The in-memory item graph.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Item storage: ItemId -> Item
    items: BTreeMap<ItemId, Item>,

    /// Ordered component edges per parent item.
    components: BTreeMap<ItemId, Vec<ComponentEdge>>,

    /// Reverse lookup: name -> ItemId
    name_index: BTreeMap<String, ItemId>,

    /// Highest id assigned so far (ids start at 1).
    last_item_id: u64,
}

impl Catalog {
    /// Create a new empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered component edges of an item (empty for leaves and unknown ids).
    pub fn edges_of(&self, parent: ItemId) -> impl Iterator<Item = ComponentEdge> + '_ {
        self.components
            .get(&parent)
            .into_iter()
            .flat_map(|edges| edges.iter().copied())
    }

    /// Get all edges as `(parent, edge)` pairs in deterministic order.
    pub fn edges(&self) -> impl Iterator<Item = (ItemId, ComponentEdge)> + '_ {
        self.components
            .iter()
            .flat_map(|(parent, edges)| edges.iter().map(move |edge| (*parent, *edge)))
    }

    /// Highest id assigned so far.
    #[must_use]
    pub fn last_item_id(&self) -> u64 {
        self.last_item_id
    }

    /// Import an item with its original id (snapshot restore).
    pub fn import_item(&mut self, item: Item) {
        if item.id.0 > self.last_item_id {
            self.last_item_id = item.id.0;
        }
        self.name_index.insert(item.name.clone(), item.id);
        self.items.insert(item.id, item);
    }
}

impl ItemGraphStore for Catalog {
    fn lookup(&self, id: ItemId) -> Result<Option<ItemNode>, BomError> {
        let Some(item) = self.items.get(&id) else {
            return Ok(None);
        };

        let components = self
            .edges_of(id)
            .map(|edge| JoinedComponent {
                edge,
                item: self.items.get(&edge.component).cloned(),
            })
            .collect();

        Ok(Some(ItemNode {
            item: item.clone(),
            components,
        }))
    }

    fn item(&self, id: ItemId) -> Result<Option<Item>, BomError> {
        Ok(self.items.get(&id).cloned())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<ItemId>, BomError> {
        Ok(self.name_index.get(name).copied())
    }

    fn items(&self) -> Result<Vec<Item>, BomError> {
        Ok(self.items.values().cloned().collect())
    }

    fn item_count(&self) -> Result<usize, BomError> {
        Ok(self.items.len())
    }

    fn edge_count(&self) -> Result<usize, BomError> {
        Ok(self.components.values().map(Vec::len).sum())
    }
}

impl CatalogWriter for Catalog {
    fn insert_item(&mut self, item: NewItem) -> Result<ItemId, BomError> {
        validate_new_item(&item)?;

        if let Some(&existing) = self.name_index.get(&item.name) {
            return Ok(existing);
        }

        self.last_item_id = self.last_item_id.saturating_add(1);
        let id = ItemId(self.last_item_id);
        self.name_index.insert(item.name.clone(), id);
        self.items.insert(id, item.into_item(id));

        Ok(id)
    }

    fn set_component(
        &mut self,
        parent: ItemId,
        component: ItemId,
        quantity: u32,
    ) -> Result<(), BomError> {
        // An update never grows the list, so only new edges count against the limit.
        let is_update = self
            .edges_of(parent)
            .any(|edge| edge.component == component);
        let edges = if is_update {
            0
        } else {
            self.components.get(&parent).map_or(0, Vec::len)
        };
        validate_edge(
            parent,
            component,
            quantity,
            self.items.contains_key(&parent),
            self.items.contains_key(&component),
            edges,
        )?;

        let list = self.components.entry(parent).or_default();
        match list.iter_mut().find(|edge| edge.component == component) {
            Some(edge) => edge.quantity = quantity,
            None => list.push(ComponentEdge::new(component, quantity)),
        }
        Ok(())
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Serializable representation of a catalog for snapshots and JSON export.
///
/// Edges are `(parent, component, quantity)` triples listed in per-parent
/// order, so a round trip preserves step numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableCatalog {
    pub items: Vec<Item>,
    pub edges: Vec<(u64, u64, u32)>,
    pub last_item_id: u64,
}

impl SerializableCatalog {
    /// Build a snapshot from any store (in-memory or persistent).
    pub fn from_store<G: ItemGraphStore>(store: &G) -> Result<Self, BomError> {
        let items = store.items()?;
        let mut edges = Vec::new();
        for item in &items {
            if let Some(node) = store.lookup(item.id)? {
                edges.extend(
                    node.components
                        .iter()
                        .map(|c| (item.id.0, c.edge.component.0, c.edge.quantity)),
                );
            }
        }
        let last_item_id = items.iter().map(|item| item.id.0).max().unwrap_or(0);
        Ok(Self {
            items,
            edges,
            last_item_id,
        })
    }
}

impl From<&Catalog> for SerializableCatalog {
    fn from(catalog: &Catalog) -> Self {
        Self {
            items: catalog.items.values().cloned().collect(),
            edges: catalog
                .edges()
                .map(|(parent, edge)| (parent.0, edge.component.0, edge.quantity))
                .collect(),
            last_item_id: catalog.last_item_id,
        }
    }
}

impl From<SerializableCatalog> for Catalog {
    fn from(sc: SerializableCatalog) -> Self {
        let mut catalog = Catalog::new();

        for item in sc.items {
            catalog.import_item(item);
        }
        catalog.last_item_id = catalog.last_item_id.max(sc.last_item_id);

        // Invalid edges are dropped on restore; repeats upsert in place.
        for (parent, component, quantity) in sc.edges {
            if let Err(e) = catalog.set_component(ItemId(parent), ItemId(component), quantity) {
                tracing::warn!(
                    parent,
                    component,
                    quantity,
                    error = %e,
                    "dropping edge from snapshot"
                );
            }
        }

        catalog
    }
}

// =============================================================================
// TESTS
// =============================================================================
