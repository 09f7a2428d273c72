//! # Core Type Definitions
//!
//! This module contains the catalog types shared by every bomcraft layer:
//! - Item identifiers and scalar attributes (`ItemId`, `Item`, `NewItem`)
//! - Component edges and their pre-joined form (`ComponentEdge`, `JoinedComponent`)
//! - The node returned by a store lookup (`ItemNode`)
//! - Error types (`BomError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer or exact-decimal arithmetic only (no floating-point)
//! - Implement `Ord` where they key a `BTreeMap`/`BTreeSet`
//! - Keep component edges in insertion order

use crate::money::Credits;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier for an item in the catalog.
///
/// Ids are positive integers assigned by the store in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// ITEM
// =============================================================================

/// Scalar attributes of a catalog item, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewItem {
    /// Unique display name.
    pub name: String,
    /// Credits spent to craft one unit, excluding components.
    pub base_cost: Credits,
    /// Active crafting minutes for one unit, excluding components.
    pub base_time_minutes: u64,
    /// Downtime units for one unit, excluding components.
    pub base_time_downtime: u64,
    /// Market price, when the catalog lists one.
    pub market_price: Option<Credits>,
    /// Free-text category (sheet name in the source catalog).
    pub category: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Display-only attributes carried over from the source sheet.
    #[serde(default)]
    pub details: ItemDetails,
}

/// Optional sheet columns shown next to an item but never priced.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDetails {
    pub prerequisites: Option<String>,
    pub max_per_downtime: Option<u64>,
    pub location: Option<String>,
    pub malfunction: Option<String>,
    pub salary: Option<u64>,
    pub prop_description: Option<String>,
    pub skill_needed: Option<String>,
}

impl ItemDetails {
    /// True when no column is filled in.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl NewItem {
    /// Create an item with the given name and no cost or time.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the base crafting cost.
    #[must_use]
    pub fn with_cost(mut self, cost: Credits) -> Self {
        self.base_cost = cost;
        self
    }

    /// Set the base crafting minutes and downtime.
    #[must_use]
    pub fn with_time(mut self, minutes: u64, downtime: u64) -> Self {
        self.base_time_minutes = minutes;
        self.base_time_downtime = downtime;
        self
    }

    /// Set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Attach an id, producing a stored `Item`.
    #[must_use]
    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            name: self.name,
            base_cost: self.base_cost,
            base_time_minutes: self.base_time_minutes,
            base_time_downtime: self.base_time_downtime,
            market_price: self.market_price,
            category: self.category,
            description: self.description,
            details: self.details,
        }
    }
}

/// A stored catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub base_cost: Credits,
    pub base_time_minutes: u64,
    pub base_time_downtime: u64,
    pub market_price: Option<Credits>,
    pub category: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub details: ItemDetails,
}

// =============================================================================
// COMPONENT EDGES
// =============================================================================

/// A directed "item requires `quantity` of `component`" edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentEdge {
    /// The required component.
    pub component: ItemId,
    /// How many units of the component one unit of the parent consumes.
    /// Always >= 1 once stored.
    pub quantity: u32,
}

impl ComponentEdge {
    /// Create a new edge.
    #[must_use]
    pub const fn new(component: ItemId, quantity: u32) -> Self {
        Self {
            component,
            quantity,
        }
    }
}

/// A component edge pre-joined with the component's own scalar fields.
///
/// `item` is `None` when the edge points at an id the store no longer holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedComponent {
    pub edge: ComponentEdge,
    pub item: Option<Item>,
}

/// Result of a point lookup: the item and its ordered component edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemNode {
    pub item: Item,
    pub components: Vec<JoinedComponent>,
}

impl ItemNode {
    /// An item with no component edges is a leaf of every expansion.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.components.is_empty()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in bomcraft.
///
/// Data anomalies met during resolution (dangling edges, cycles) are NOT
/// errors; they are recorded as `resolver::Anomaly` entries. Only an
/// unknown root item and storage failures surface here.
#[derive(Debug, Error)]
pub enum BomError {
    /// The requested item was not found in the catalog.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// An item record failed validation.
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// A component edge failed validation.
    #[error("Invalid component edge {parent} -> {component}: {reason}")]
    InvalidEdge {
        parent: ItemId,
        component: ItemId,
        reason: String,
    },

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
