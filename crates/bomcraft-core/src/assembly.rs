//! # Step Assembler
//!
//! Output assembly for a resolve call.
//!
//! - Owns the call-wide step list and its shared step counter
//! - Folds the root's propagated base components into the breakdown
//! - Produces the final `CraftingResult`
//!
//! The assembler holds no formatting logic; rendering belongs to the app layer.

use crate::resolver::Anomaly;
use crate::{Credits, Item, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// OUTPUT TYPES
// =============================================================================

/// A component and the quantity needed of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity: u64,
}

impl ComponentRef {
    /// Create a component reference.
    #[must_use]
    pub fn new(item_id: ItemId, item_name: impl Into<String>, quantity: u64) -> Self {
        Self {
            item_id,
            item_name: item_name.into(),
            quantity,
        }
    }

    /// Same component, quantity multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: u64) -> Self {
        Self {
            item_id: self.item_id,
            item_name: self.item_name.clone(),
            quantity: self.quantity.saturating_mul(factor),
        }
    }
}

/// One intermediate crafting step.
///
/// `components` lists only the base components discovered directly at
/// this level. Quantities are scaled by the multiplier of the item's
/// first expansion; a sub-assembly met again later reuses that expansion
/// and adds no step, so its step does not show the later occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftingStep {
    pub step_component_name: String,
    pub step_number: u32,
    pub cost: Credits,
    pub time_minutes: u64,
    pub time_downtime: u64,
    pub components: Vec<ComponentRef>,
}

/// One line of the flattened breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub item_name: String,
    pub quantity: u64,
    pub cost: Credits,
    pub time_minutes: u64,
    pub time_downtime: u64,
}

/// The full answer for one root item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftingResult {
    pub total_cost: Credits,
    pub total_time_minutes: u64,
    pub total_time_downtime: u64,
    pub steps: Vec<CraftingStep>,
    pub breakdown: Vec<BreakdownEntry>,
    pub anomalies: Vec<Anomaly>,
}

impl CraftingResult {
    /// Free-text anomaly log, one `"...; "` entry per anomaly.
    #[must_use]
    pub fn debug_log(&self) -> String {
        self.anomalies
            .iter()
            .map(|anomaly| format!("{}; ", anomaly))
            .collect()
    }

    /// True when resolution met no dangling edge, cycle or depth cut.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}

// =============================================================================
// PER-UNIT VALUES
// =============================================================================

/// Cost and time of one unit of an item, components included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnitCost {
    pub cost: Credits,
    pub time_minutes: u64,
    pub time_downtime: u64,
}

impl UnitCost {
    /// Own base values of an item, with no component contribution.
    #[must_use]
    pub fn base_of(item: &Item) -> Self {
        Self {
            cost: item.base_cost,
            time_minutes: item.base_time_minutes,
            time_downtime: item.base_time_downtime,
        }
    }

    /// Values for `quantity` units.
    #[must_use]
    pub fn times(self, quantity: u64) -> Self {
        Self {
            cost: self.cost.times(quantity),
            time_minutes: self.time_minutes.saturating_mul(quantity),
            time_downtime: self.time_downtime.saturating_mul(quantity),
        }
    }
}

// =============================================================================
// ASSEMBLER
// =============================================================================

/// Collects steps in completion order and builds the final result.
#[derive(Debug, Default)]
pub struct StepAssembler {
    steps: Vec<CraftingStep>,
}

impl StepAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished level. Returns the step number assigned.
    ///
    /// Levels that discovered no base component emit nothing and return `None`.
    pub fn push_step(
        &mut self,
        name: &str,
        totals: UnitCost,
        components: Vec<ComponentRef>,
    ) -> Option<u32> {
        if components.is_empty() {
            return None;
        }
        let step_number = u32::try_from(self.steps.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        self.steps.push(CraftingStep {
            step_component_name: name.to_string(),
            step_number,
            cost: totals.cost,
            time_minutes: totals.time_minutes,
            time_downtime: totals.time_downtime,
            components,
        });
        Some(step_number)
    }

    /// Steps recorded so far.
    #[must_use]
    pub fn steps(&self) -> &[CraftingStep] {
        &self.steps
    }

    /// Build the final result.
    ///
    /// The breakdown starts with the root entry (quantity 1, totals), then
    /// one entry per distinct base component of `base_components`,
    /// aggregated by item id in first-appearance order and priced at the
    /// component's per-unit values from `unit_costs`.
    #[must_use]
    pub fn finish(
        self,
        root: &Item,
        totals: UnitCost,
        base_components: &[ComponentRef],
        unit_costs: &BTreeMap<ItemId, UnitCost>,
        anomalies: Vec<Anomaly>,
    ) -> CraftingResult {
        let mut breakdown = vec![BreakdownEntry {
            item_name: root.name.clone(),
            quantity: 1,
            cost: totals.cost,
            time_minutes: totals.time_minutes,
            time_downtime: totals.time_downtime,
        }];

        let mut order: Vec<(ItemId, &str)> = Vec::new();
        let mut quantities: BTreeMap<ItemId, u64> = BTreeMap::new();
        for component in base_components {
            let total = quantities.entry(component.item_id).or_insert_with(|| {
                order.push((component.item_id, component.item_name.as_str()));
                0
            });
            *total = total.saturating_add(component.quantity);
        }

        for (id, name) in order {
            let quantity = quantities.get(&id).copied().unwrap_or(0);
            let unit = unit_costs.get(&id).copied().unwrap_or_default();
            let line = unit.times(quantity);
            breakdown.push(BreakdownEntry {
                item_name: name.to_string(),
                quantity,
                cost: line.cost,
                time_minutes: line.time_minutes,
                time_downtime: line.time_downtime,
            });
        }

        CraftingResult {
            total_cost: totals.cost,
            total_time_minutes: totals.time_minutes,
            total_time_downtime: totals.time_downtime,
            steps: self.steps,
            breakdown,
            anomalies,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
