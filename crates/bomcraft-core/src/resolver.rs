//! # Crafting Resolver
//!
//! Recursive bill-of-materials expansion.
//!
//! Given a root item, the resolver walks the "requires N of" edges depth
//! first, in edge order, and computes:
//! - the exact credit cost and both time costs of one unit of the root
//! - the ordered list of intermediate crafting steps
//! - the flattened base-component breakdown
//!
//! ## Visit bookkeeping
//!
//! Two structures replace a single per-call "visited" flag:
//! - a **memo** of fully expanded items, so an item shared by several
//!   parents is counted in full at every occurrence but expanded once;
//! - an **in-progress stack** of the ancestors currently being expanded.
//!   Only re-entering an item on that stack is a cycle. The cyclic
//!   reference contributes its own base cost and time and is logged as
//!   [`Anomaly::CyclicReference`].
//!
//! Expansion is also bounded by a depth limit (at most
//! [`MAX_RESOLVE_DEPTH`]). A cut depends on the path that reached the
//! item, so an expansion containing a depth cut is never memoized; the
//! item is expanded again wherever it is met next.
//!
//! ## Quantities
//!
//! Costs and times travel upward *per unit*; each parent multiplies a
//! child's values by the edge quantity. Base-component quantities travel
//! upward already multiplied, so a component's effective quantity is its
//! local quantity times every ancestor's local quantity.

use crate::assembly::{ComponentRef, CraftingResult, CraftingStep, StepAssembler, UnitCost};
use crate::catalog::ItemGraphStore;
use crate::primitives::{DEFAULT_RESOLVE_DEPTH, MAX_RESOLVE_DEPTH};
use crate::{BomError, Credits, Item, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// ANOMALIES
// =============================================================================

/// A recoverable data problem met during resolution.
///
/// Anomalies never abort a resolve call; the affected contribution is
/// truncated or zeroed and the anomaly is reported with the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// A referenced item has no node in the store.
    MissingItem { item: ItemId },

    /// A component edge points at an item the store does not hold.
    MissingComponent { parent: ItemId, component: ItemId },

    /// An item was re-entered while one of its own expansions was active.
    /// `path` runs from the first occurrence to the re-entry.
    CyclicReference { item: ItemId, path: Vec<ItemId> },

    /// Expansion was cut at the depth limit.
    DepthLimitExceeded { item: ItemId, depth: usize },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingItem { item } => write!(f, "Unknown item: {}", item),
            Self::MissingComponent { parent, component } => {
                write!(f, "Unknown component {} for item {}", component, parent)
            }
            Self::CyclicReference { item, path } => {
                let chain: Vec<String> = path.iter().map(ToString::to_string).collect();
                write!(f, "Cyclic reference to item {}: {}", item, chain.join(" -> "))
            }
            Self::DepthLimitExceeded { item, depth } => {
                write!(f, "Depth limit {} exceeded at item {}", depth, item)
            }
        }
    }
}

// =============================================================================
// OPTIONS & INTERMEDIATE RESULTS
// =============================================================================

/// Tunables for a resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Deepest level that is still expanded (root is level 0).
    /// Clamped to `MAX_RESOLVE_DEPTH`.
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_RESOLVE_DEPTH,
        }
    }
}

impl ResolveOptions {
    /// Options with the given depth limit.
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    fn bounded_depth(self) -> usize {
        self.max_depth.min(MAX_RESOLVE_DEPTH)
    }
}

/// Result of processing one item at some multiplier.
///
/// `cost` and the times are per unit of the item. `base_components` is
/// multiplier-adjusted and empty when the item is a base component
/// relative to this expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intermediate {
    pub cost: Credits,
    pub time_minutes: u64,
    pub time_downtime: u64,
    pub base_components: Vec<ComponentRef>,
}

/// A memoized expansion, independent of any multiplier.
#[derive(Debug, Clone)]
struct UnitExpansion {
    unit: UnitCost,
    /// Base components needed for ONE unit of the item.
    base_components: Vec<ComponentRef>,
    /// The depth guard cut this expansion or one below it.
    depth_limited: bool,
}

impl UnitExpansion {
    fn empty() -> Self {
        Self {
            unit: UnitCost::default(),
            base_components: Vec::new(),
            depth_limited: false,
        }
    }

    fn truncated(item: &Item) -> Self {
        Self {
            unit: UnitCost::base_of(item),
            base_components: Vec::new(),
            depth_limited: false,
        }
    }

    fn depth_cut(item: &Item) -> Self {
        Self {
            depth_limited: true,
            ..Self::truncated(item)
        }
    }

    fn at_multiplier(&self, multiplier: u64) -> Intermediate {
        Intermediate {
            cost: self.unit.cost,
            time_minutes: self.unit.time_minutes,
            time_downtime: self.unit.time_downtime,
            base_components: self
                .base_components
                .iter()
                .map(|c| c.scaled(multiplier))
                .collect(),
        }
    }
}

// =============================================================================
// RESOLVE CONTEXT
// =============================================================================

/// All mutable state of one top-level resolve call.
///
/// A fresh context per call keeps independent calls isolated; nothing is
/// shared between them.
#[derive(Debug, Default)]
pub struct ResolveContext {
    memo: BTreeMap<ItemId, UnitExpansion>,
    in_progress: Vec<ItemId>,
    unit_costs: BTreeMap<ItemId, UnitCost>,
    assembler: StepAssembler,
    anomalies: Vec<Anomaly>,
}

impl ResolveContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps emitted so far, in completion order.
    #[must_use]
    pub fn steps(&self) -> &[CraftingStep] {
        self.assembler.steps()
    }

    /// Anomalies logged so far.
    #[must_use]
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    fn record(&mut self, anomaly: Anomaly) {
        tracing::warn!(anomaly = %anomaly, "crafting anomaly");
        self.anomalies.push(anomaly);
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Computes crafting requirements over a read-only item graph.
#[derive(Debug)]
pub struct Resolver<'a, G: ItemGraphStore> {
    store: &'a G,
    options: ResolveOptions,
}

impl<'a, G: ItemGraphStore> Resolver<'a, G> {
    /// Create a resolver with default options.
    #[must_use]
    pub fn new(store: &'a G) -> Self {
        Self::with_options(store, ResolveOptions::default())
    }

    /// Create a resolver with explicit options.
    #[must_use]
    pub fn with_options(store: &'a G, options: ResolveOptions) -> Self {
        Self { store, options }
    }

    /// Resolve the full crafting requirements of one unit of `root`.
    ///
    /// # Errors
    ///
    /// `BomError::ItemNotFound` if `root` is unknown; storage errors from
    /// the store are propagated. Data anomalies below the root are not
    /// errors and are reported in `CraftingResult::anomalies`.
    pub fn resolve(&self, root: ItemId) -> Result<CraftingResult, BomError> {
        let root_item = self
            .store
            .item(root)?
            .ok_or(BomError::ItemNotFound(root))?;

        tracing::debug!(item = %root, name = %root_item.name, "resolving crafting requirements");

        let mut ctx = ResolveContext::new();
        let expansion = self.expand(&mut ctx, root, 1, 0)?;

        let ResolveContext {
            unit_costs,
            assembler,
            anomalies,
            ..
        } = ctx;

        Ok(assembler.finish(
            &root_item,
            expansion.unit,
            &expansion.base_components,
            &unit_costs,
            anomalies,
        ))
    }

    /// Process one item at the given multiplier within an existing context.
    ///
    /// Steps and anomalies are appended to `ctx`; the returned value holds
    /// the per-unit cost and times plus the multiplier-adjusted base
    /// components.
    pub fn process(
        &self,
        ctx: &mut ResolveContext,
        id: ItemId,
        multiplier: u64,
    ) -> Result<Intermediate, BomError> {
        let depth = ctx.in_progress.len();
        let expansion = self.expand(ctx, id, multiplier, depth)?;
        Ok(expansion.at_multiplier(multiplier))
    }

    /// Expand `id`, returning its multiplier-independent values.
    ///
    /// `multiplier` only scales the quantities written into emitted steps.
    fn expand(
        &self,
        ctx: &mut ResolveContext,
        id: ItemId,
        multiplier: u64,
        depth: usize,
    ) -> Result<UnitExpansion, BomError> {
        if let Some(done) = ctx.memo.get(&id) {
            return Ok(done.clone());
        }

        let Some(node) = self.store.lookup(id)? else {
            ctx.record(Anomaly::MissingItem { item: id });
            return Ok(UnitExpansion::empty());
        };

        if let Some(pos) = ctx.in_progress.iter().position(|&active| active == id) {
            let mut path = ctx.in_progress[pos..].to_vec();
            path.push(id);
            ctx.record(Anomaly::CyclicReference { item: id, path });
            return Ok(UnitExpansion::truncated(&node.item));
        }

        let max_depth = self.options.bounded_depth();
        if depth > max_depth && !node.is_leaf() {
            ctx.record(Anomaly::DepthLimitExceeded {
                item: id,
                depth: max_depth,
            });
            return Ok(UnitExpansion::depth_cut(&node.item));
        }

        tracing::debug!(item = %id, depth, multiplier, "expanding item");
        ctx.in_progress.push(id);

        let mut totals = UnitCost::base_of(&node.item);
        let mut step_components = Vec::new();
        let mut base_components = Vec::new();
        let mut depth_limited = false;

        for joined in &node.components {
            let Some(component) = &joined.item else {
                ctx.record(Anomaly::MissingComponent {
                    parent: id,
                    component: joined.edge.component,
                });
                continue;
            };

            let quantity = u64::from(joined.edge.quantity);
            let child_multiplier = quantity.saturating_mul(multiplier);
            let child = match self.expand(ctx, component.id, child_multiplier, depth + 1) {
                Ok(child) => child,
                Err(e) => {
                    ctx.in_progress.pop();
                    return Err(e);
                }
            };

            depth_limited |= child.depth_limited;
            let contribution = child.unit.times(quantity);
            totals.cost += contribution.cost;
            totals.time_minutes = totals.time_minutes.saturating_add(contribution.time_minutes);
            totals.time_downtime = totals
                .time_downtime
                .saturating_add(contribution.time_downtime);

            if child.base_components.is_empty() {
                step_components.push(ComponentRef::new(
                    component.id,
                    component.name.clone(),
                    child_multiplier,
                ));
                base_components.push(ComponentRef::new(
                    component.id,
                    component.name.clone(),
                    quantity,
                ));
                ctx.unit_costs.entry(component.id).or_insert(child.unit);
            } else {
                base_components.extend(child.base_components.iter().map(|c| c.scaled(quantity)));
            }
        }

        ctx.in_progress.pop();

        if let Some(step) = ctx
            .assembler
            .push_step(&node.item.name, totals, step_components)
        {
            tracing::debug!(item = %id, step, "step completed");
        }

        let expansion = UnitExpansion {
            unit: totals,
            base_components,
            depth_limited,
        };
        if !depth_limited {
            ctx.memo.insert(id, expansion.clone());
        }
        Ok(expansion)
    }
}

/// Resolve the crafting requirements of `root` with default options.
pub fn calculate_crafting_requirements<G: ItemGraphStore>(
    store: &G,
    root: ItemId,
) -> Result<CraftingResult, BomError> {
    Resolver::new(store).resolve(root)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogWriter};
    use crate::NewItem;
    use rust_decimal_macros::dec;

    fn item(catalog: &mut Catalog, name: &str, cost: u64, minutes: u64) -> ItemId {
        catalog
            .insert_item(
                NewItem::new(name)
                    .with_cost(Credits::from_units(cost))
                    .with_time(minutes, 0),
            )
            .expect("insert")
    }

    /// Gizmo(10, 5 min) = 2 x Widget(3) + 1 x Sprocket(0 = 4 x Widget).
    fn gizmo_catalog() -> (Catalog, ItemId, ItemId, ItemId) {
        let mut catalog = Catalog::new();
        let gizmo = item(&mut catalog, "Gizmo", 10, 5);
        let widget = item(&mut catalog, "Widget", 3, 0);
        let sprocket = item(&mut catalog, "Sprocket", 0, 0);
        catalog.set_component(gizmo, widget, 2).expect("edge");
        catalog.set_component(gizmo, sprocket, 1).expect("edge");
        catalog.set_component(sprocket, widget, 4).expect("edge");
        (catalog, gizmo, widget, sprocket)
    }

    #[test]
    fn leaf_item_has_only_its_base_cost() {
        let mut catalog = Catalog::new();
        let widget = item(&mut catalog, "Widget", 3, 7);

        let result = Resolver::new(&catalog).resolve(widget).expect("resolve");

        assert_eq!(result.total_cost, Credits::from_units(3));
        assert_eq!(result.total_time_minutes, 7);
        assert!(result.steps.is_empty());
        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.breakdown[0].item_name, "Widget");
        assert!(result.is_clean());
    }

    #[test]
    fn gizmo_scenario_totals_and_breakdown() {
        let (catalog, gizmo, _, _) = gizmo_catalog();

        let result = Resolver::new(&catalog).resolve(gizmo).expect("resolve");

        assert_eq!(result.total_cost, Credits::from_units(28));
        assert_eq!(result.total_time_minutes, 5);
        assert_eq!(result.breakdown.len(), 2);
        assert_eq!(result.breakdown[1].item_name, "Widget");
        assert_eq!(result.breakdown[1].quantity, 6);
        assert_eq!(result.breakdown[1].cost, Credits::from_units(18));
    }

    #[test]
    fn gizmo_steps_are_numbered_in_completion_order() {
        let (catalog, gizmo, _, _) = gizmo_catalog();

        let result = Resolver::new(&catalog).resolve(gizmo).expect("resolve");

        let steps: Vec<_> = result
            .steps
            .iter()
            .map(|s| (s.step_number, s.step_component_name.as_str()))
            .collect();
        assert_eq!(steps, vec![(1, "Sprocket"), (2, "Gizmo")]);
        assert_eq!(result.steps[0].cost, Credits::from_units(12));
        assert_eq!(result.steps[0].components[0].quantity, 4);
        // Gizmo's own step lists only Widget: Sprocket's widgets were spliced.
        assert_eq!(result.steps[1].components.len(), 1);
        assert_eq!(result.steps[1].components[0].quantity, 2);
    }

    #[test]
    fn multiplier_composes_down_the_tree() {
        let mut catalog = Catalog::new();
        let x = item(&mut catalog, "X", 0, 0);
        let y = item(&mut catalog, "Y", 0, 0);
        let z = item(&mut catalog, "Z", 1, 0);
        catalog.set_component(x, y, 2).expect("edge");
        catalog.set_component(y, z, 3).expect("edge");

        let resolver = Resolver::new(&catalog);
        let mut ctx = ResolveContext::new();
        let intermediate = resolver.process(&mut ctx, x, 1).expect("process");

        assert_eq!(intermediate.base_components.len(), 1);
        assert_eq!(intermediate.base_components[0].item_name, "Z");
        assert_eq!(intermediate.base_components[0].quantity, 6);
        assert_eq!(intermediate.cost, Credits::from_units(6));
        // Y's step reports Z at the whole-build quantity.
        assert_eq!(ctx.steps()[0].components[0].quantity, 6);
    }

    #[test]
    fn process_scales_base_components_by_multiplier() {
        let (catalog, _, _, sprocket) = gizmo_catalog();

        let resolver = Resolver::new(&catalog);
        let mut ctx = ResolveContext::new();
        let intermediate = resolver.process(&mut ctx, sprocket, 5).expect("process");

        assert_eq!(intermediate.cost, Credits::from_units(12));
        assert_eq!(intermediate.base_components[0].quantity, 20);
    }

    #[test]
    fn shared_subassembly_counted_at_every_occurrence() {
        // Root needs 1 Gear directly and 1 Gearbox (= 2 Gear + 1 Shaft).
        // Gear itself is a subassembly (= 3 Plate), so a plain "visited"
        // flag would under-count the second Gear occurrence.
        let mut catalog = Catalog::new();
        let root = item(&mut catalog, "Root", 0, 0);
        let gear = item(&mut catalog, "Gear", 1, 1);
        let plate = item(&mut catalog, "Plate", 2, 0);
        let gearbox = item(&mut catalog, "Gearbox", 0, 0);
        let shaft = item(&mut catalog, "Shaft", 5, 0);
        catalog.set_component(gear, plate, 3).expect("edge");
        catalog.set_component(gearbox, gear, 2).expect("edge");
        catalog.set_component(gearbox, shaft, 1).expect("edge");
        catalog.set_component(root, gear, 1).expect("edge");
        catalog.set_component(root, gearbox, 1).expect("edge");

        let result = Resolver::new(&catalog).resolve(root).expect("resolve");

        // Gear = 1 + 3*2 = 7; Gearbox = 2*7 + 5 = 19; Root = 7 + 19 = 26.
        assert_eq!(result.total_cost, Credits::from_units(26));
        assert_eq!(result.total_time_minutes, 3);
        let plates = result
            .breakdown
            .iter()
            .find(|b| b.item_name == "Plate")
            .expect("plate line");
        assert_eq!(plates.quantity, 9);
        assert!(result.is_clean());
        // Gear is expanded once, so it emits a single step.
        assert_eq!(
            result
                .steps
                .iter()
                .filter(|s| s.step_component_name == "Gear")
                .count(),
            1
        );
    }

    #[test]
    fn cycle_is_truncated_and_logged() {
        let mut catalog = Catalog::new();
        let a = item(&mut catalog, "A", 1, 0);
        let b = item(&mut catalog, "B", 2, 0);
        catalog.set_component(a, b, 1).expect("edge");
        catalog.set_component(b, a, 1).expect("edge");

        let result = Resolver::new(&catalog).resolve(a).expect("resolve");

        // B = 2 + A's own base 1; A = 1 + 3.
        assert_eq!(result.total_cost, Credits::from_units(4));
        assert_eq!(
            result.anomalies,
            vec![Anomaly::CyclicReference {
                item: a,
                path: vec![a, b, a],
            }]
        );
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut catalog = Catalog::new();
        let ouroboros = item(&mut catalog, "Ouroboros", 4, 1);
        catalog.set_component(ouroboros, ouroboros, 2).expect("edge");

        let result = Resolver::new(&catalog).resolve(ouroboros).expect("resolve");

        assert_eq!(result.total_cost, Credits::from_units(12));
        assert_eq!(result.total_time_minutes, 3);
        assert_eq!(result.anomalies.len(), 1);
    }

    #[test]
    fn depth_limit_truncates_expansion() {
        let mut catalog = Catalog::new();
        let a = item(&mut catalog, "A", 1, 0);
        let b = item(&mut catalog, "B", 1, 0);
        let c = item(&mut catalog, "C", 1, 0);
        let d = item(&mut catalog, "D", 100, 0);
        catalog.set_component(a, b, 1).expect("edge");
        catalog.set_component(b, c, 1).expect("edge");
        catalog.set_component(c, d, 1).expect("edge");

        let full = Resolver::new(&catalog).resolve(a).expect("resolve");
        assert_eq!(full.total_cost, Credits::from_units(103));

        let cut = Resolver::with_options(&catalog, ResolveOptions::with_max_depth(1))
            .resolve(a)
            .expect("resolve");
        assert_eq!(cut.total_cost, Credits::from_units(3));
        assert_eq!(
            cut.anomalies,
            vec![Anomaly::DepthLimitExceeded { item: c, depth: 1 }]
        );
    }

    #[test]
    fn depth_cut_on_a_deep_path_does_not_stick() {
        // R needs P and Q; P also needs Q. Through P, X sits past the
        // limit and is cut. Reached directly from R, Q fits and must be
        // expanded in full.
        let mut catalog = Catalog::new();
        let r = item(&mut catalog, "R", 0, 0);
        let p = item(&mut catalog, "P", 0, 0);
        let q = item(&mut catalog, "Q", 0, 0);
        let x = item(&mut catalog, "X", 0, 0);
        let y = item(&mut catalog, "Y", 100, 0);
        catalog.set_component(r, p, 1).expect("edge");
        catalog.set_component(r, q, 1).expect("edge");
        catalog.set_component(p, q, 1).expect("edge");
        catalog.set_component(q, x, 1).expect("edge");
        catalog.set_component(x, y, 1).expect("edge");

        let result = Resolver::with_options(&catalog, ResolveOptions::with_max_depth(2))
            .resolve(r)
            .expect("resolve");

        assert_eq!(result.total_cost, Credits::from_units(100));
        assert_eq!(
            result.anomalies,
            vec![Anomaly::DepthLimitExceeded { item: x, depth: 2 }]
        );
        // Under P, Q stops at the cut X; under R, X is expanded in full.
        let steps: Vec<_> = result
            .steps
            .iter()
            .map(|s| s.step_component_name.as_str())
            .collect();
        assert_eq!(steps, vec!["Q", "X"]);
    }

    #[test]
    fn unknown_root_is_an_error() {
        let catalog = Catalog::new();
        let result = Resolver::new(&catalog).resolve(ItemId(404));
        assert!(matches!(result, Err(BomError::ItemNotFound(ItemId(404)))));
    }

    #[test]
    fn process_unknown_item_yields_zero_and_anomaly() {
        let catalog = Catalog::new();
        let resolver = Resolver::new(&catalog);
        let mut ctx = ResolveContext::new();

        let intermediate = resolver.process(&mut ctx, ItemId(7), 3).expect("process");

        assert_eq!(intermediate.cost, Credits::ZERO);
        assert!(intermediate.base_components.is_empty());
        assert_eq!(ctx.anomalies(), &[Anomaly::MissingItem { item: ItemId(7) }]);
    }

    #[test]
    fn decimal_costs_accumulate_exactly() {
        let mut catalog = Catalog::new();
        let kit = catalog
            .insert_item(NewItem::new("Kit").with_cost(Credits::new(dec!(0.1))))
            .expect("insert");
        let screw = catalog
            .insert_item(NewItem::new("Screw").with_cost(Credits::new(dec!(0.1))))
            .expect("insert");
        let washer = catalog
            .insert_item(NewItem::new("Washer").with_cost(Credits::new(dec!(0.2))))
            .expect("insert");
        catalog.set_component(kit, screw, 3).expect("edge");
        catalog.set_component(kit, washer, 1).expect("edge");

        let result = calculate_crafting_requirements(&catalog, kit).expect("resolve");

        assert_eq!(result.total_cost.to_string(), "0.6");
        assert_eq!(result.debug_log(), "");
    }

    #[test]
    fn repeated_calls_are_identical() {
        let (catalog, gizmo, _, _) = gizmo_catalog();
        let resolver = Resolver::new(&catalog);

        let first = resolver.resolve(gizmo).expect("resolve");
        let second = resolver.resolve(gizmo).expect("resolve");

        assert_eq!(first, second);
    }

    #[test]
    fn anomaly_display() {
        let cycle = Anomaly::CyclicReference {
            item: ItemId(1),
            path: vec![ItemId(1), ItemId(2), ItemId(1)],
        };
        assert_eq!(cycle.to_string(), "Cyclic reference to item 1: 1 -> 2 -> 1");
        assert_eq!(
            Anomaly::DepthLimitExceeded {
                item: ItemId(3),
                depth: 64
            }
            .to_string(),
            "Depth limit 64 exceeded at item 3"
        );
    }
}
