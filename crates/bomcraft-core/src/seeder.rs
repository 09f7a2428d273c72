//! # Catalog Seeder
//!
//! Builds a catalog from spreadsheet-derived item records.
//!
//! Records carry every field as text, the way a spreadsheet export does.
//! Seeding runs in two phases:
//! 1. insert every item (a repeated name keeps its first record);
//! 2. resolve each `ressourcesNeeded` entry by name and upsert the edge.
//!
//! Unresolvable components are reported as warnings, never as errors.
//! Malformed records (empty or overlong names, too many components) reject
//! the whole batch before anything is written.

use crate::catalog::{CatalogWriter, ItemGraphStore};
use crate::primitives::{MAX_COMPONENTS_PER_ITEM, MAX_NAME_LENGTH, MAX_SEED_RECORDS};
use crate::{BomError, Credits, ItemDetails, NewItem};
use serde::{Deserialize, Serialize};

// =============================================================================
// INPUT RECORDS
// =============================================================================

/// One row of the item spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRecord {
    pub name: String,
    #[serde(default)]
    pub market_price: Option<String>,
    #[serde(default)]
    pub cost_to_craft_in_credit: Option<String>,
    #[serde(default, rename = "ressourcesNeeded")]
    pub resources_needed: Option<String>,
    #[serde(default)]
    pub craft_time_in_minutes: Option<String>,
    #[serde(default)]
    pub craft_time_in_downtime: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub descriptions: Option<String>,
    #[serde(default)]
    pub prerequisites: Option<String>,
    #[serde(default)]
    pub max_per_downtime: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub malfunction: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub prop_description: Option<String>,
    #[serde(default)]
    pub skill_needed: Option<String>,
}

impl SeedRecord {
    /// Record with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Convert the scalar fields into an insertable item.
    pub fn to_new_item(&self) -> NewItem {
        let text = |field: &Option<String>| {
            field
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        NewItem {
            name: self.name.trim().to_string(),
            base_cost: self
                .cost_to_craft_in_credit
                .as_deref()
                .and_then(Credits::parse_lenient)
                .unwrap_or(Credits::ZERO),
            base_time_minutes: self
                .craft_time_in_minutes
                .as_deref()
                .and_then(parse_whole)
                .unwrap_or(0),
            base_time_downtime: self
                .craft_time_in_downtime
                .as_deref()
                .and_then(parse_whole)
                .unwrap_or(0),
            market_price: self.market_price.as_deref().and_then(Credits::parse_lenient),
            category: text(&self.category),
            description: text(&self.descriptions),
            details: ItemDetails {
                prerequisites: text(&self.prerequisites),
                max_per_downtime: self.max_per_downtime.as_deref().and_then(parse_whole),
                location: text(&self.location),
                malfunction: text(&self.malfunction),
                salary: self.salary.as_deref().and_then(parse_whole),
                prop_description: text(&self.prop_description),
                skill_needed: text(&self.skill_needed),
            },
        }
    }

    /// Parsed `(component name, quantity)` pairs.
    pub fn components(&self) -> Vec<(String, u32)> {
        self.resources_needed
            .as_deref()
            .map(parse_components)
            .unwrap_or_default()
    }
}

// =============================================================================
// FIELD PARSERS
// =============================================================================

/// Parse a whole number (minutes, counts, salary) from the leading digits.
///
/// Empty, non-numeric and zero inputs yield `None`.
pub fn parse_whole(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let digits: &str = trimmed
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(trimmed, |(idx, _)| &trimmed[..idx]);
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    (value > 0).then_some(value)
}

/// Parse a `ressourcesNeeded` cell.
///
/// Parts are separated by `+`. A part shaped like `Name (N)` yields
/// `(Name, N)`; any other non-empty part yields `(part, 1)`.
///
/// ```
/// use bomcraft_core::seeder::parse_components;
///
/// assert_eq!(
///     parse_components("Iron Plate (2) + Screw"),
///     vec![("Iron Plate".to_string(), 2), ("Screw".to_string(), 1)]
/// );
/// ```
pub fn parse_components(raw: &str) -> Vec<(String, u32)> {
    raw.split('+')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_component)
        .collect()
}

fn parse_component(part: &str) -> (String, u32) {
    for (idx, _) in part.match_indices('(').filter(|(idx, _)| *idx > 0) {
        let rest = &part[idx + 1..];
        let digits_end = rest
            .char_indices()
            .find(|(_, ch)| !ch.is_ascii_digit())
            .map_or(rest.len(), |(i, _)| i);
        if digits_end > 0 && rest[digits_end..].starts_with(')') {
            let quantity = rest[..digits_end].parse::<u32>().unwrap_or(u32::MAX);
            return (part[..idx].trim().to_string(), quantity);
        }
    }
    (part.to_string(), 1)
}

// =============================================================================
// SEEDER
// =============================================================================

/// Outcome of a seeding run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    /// Items newly inserted.
    pub items_inserted: usize,
    /// Records whose name already existed.
    pub duplicates: usize,
    /// Component edges inserted or updated.
    pub edges_linked: usize,
    /// Skipped relationships, in record order.
    pub warnings: Vec<String>,
}

/// Validate a batch before anything is written.
pub fn validate_records(records: &[SeedRecord]) -> Result<(), BomError> {
    if records.len() > MAX_SEED_RECORDS {
        return Err(BomError::InvalidItem(format!(
            "{} records exceeds the limit of {}",
            records.len(),
            MAX_SEED_RECORDS
        )));
    }

    for (index, record) in records.iter().enumerate() {
        let name = record.name.trim();
        if name.is_empty() {
            return Err(BomError::InvalidItem(format!(
                "record {} has an empty name",
                index
            )));
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(BomError::InvalidItem(format!(
                "record {} name exceeds {} bytes",
                index, MAX_NAME_LENGTH
            )));
        }
        if record.components().len() > MAX_COMPONENTS_PER_ITEM {
            return Err(BomError::InvalidItem(format!(
                "'{}' lists more than {} components",
                name, MAX_COMPONENTS_PER_ITEM
            )));
        }
    }
    Ok(())
}

/// Seed `store` from `records`.
pub fn seed<G>(store: &mut G, records: &[SeedRecord]) -> Result<SeedReport, BomError>
where
    G: ItemGraphStore + CatalogWriter,
{
    validate_records(records)?;
    tracing::info!(records = records.len(), "seeding catalog");

    let mut report = SeedReport::default();

    // Phase 1: items
    for record in records {
        let item = record.to_new_item();
        if store.find_by_name(&item.name)?.is_some() {
            tracing::debug!(name = %item.name, "duplicate item name, keeping first");
            report.duplicates += 1;
            continue;
        }
        let id = store.insert_item(item)?;
        tracing::debug!(item = %id, name = %record.name.trim(), "inserted item");
        report.items_inserted += 1;
    }

    // Phase 2: component edges
    for record in records {
        let parent_name = record.name.trim();
        let Some(parent) = store.find_by_name(parent_name)? else {
            continue;
        };

        for (component_name, quantity) in record.components() {
            let Some(component) = store.find_by_name(&component_name)? else {
                let warning = format!(
                    "Could not find component '{}' for item '{}'",
                    component_name, parent_name
                );
                tracing::warn!("{}", warning);
                report.warnings.push(warning);
                continue;
            };

            match store.set_component(parent, component, quantity) {
                Ok(()) => report.edges_linked += 1,
                Err(BomError::InvalidEdge { reason, .. }) => {
                    let warning = format!(
                        "Skipped {} -> {} ({}): {}",
                        parent_name, component_name, quantity, reason
                    );
                    tracing::warn!("{}", warning);
                    report.warnings.push(warning);
                }
                Err(e) => return Err(e),
            }
        }
    }

    tracing::info!(
        inserted = report.items_inserted,
        edges = report.edges_linked,
        warnings = report.warnings.len(),
        "seeding complete"
    );
    Ok(report)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Catalog;
    use rust_decimal_macros::dec;

    fn record(name: &str, cost: &str, resources: &str) -> SeedRecord {
        SeedRecord {
            cost_to_craft_in_credit: Some(cost.to_string()),
            resources_needed: Some(resources.to_string()),
            ..SeedRecord::named(name)
        }
    }

    #[test]
    fn parse_components_grammar() {
        assert_eq!(
            parse_components("Widget (2) + Sprocket"),
            vec![("Widget".to_string(), 2), ("Sprocket".to_string(), 1)]
        );
        assert_eq!(
            parse_components(" Steel(10)+ +Gear (3) spare "),
            vec![("Steel".to_string(), 10), ("Gear".to_string(), 3)]
        );
        assert!(parse_components("").is_empty());
        assert!(parse_components("  +  ").is_empty());
    }

    #[test]
    fn parse_components_without_count_is_quantity_one() {
        assert_eq!(
            parse_components("Lens (x2)"),
            vec![("Lens (x2)".to_string(), 1)]
        );
        assert_eq!(parse_components("(4)"), vec![("(4)".to_string(), 1)]);
    }

    #[test]
    fn sheet_detail_columns_are_carried() {
        let records: Vec<SeedRecord> = serde_json::from_str(
            r#"[{
                "name": "Medkit",
                "prerequisites": "First Aid",
                "maxPerDowntime": "3",
                "location": " Infirmary ",
                "malfunction": "",
                "salary": "0",
                "propDescription": "A red box",
                "skillNeeded": "Medicine 2"
            }]"#,
        )
        .expect("parse records");

        let details = records[0].to_new_item().details;

        assert_eq!(details.prerequisites.as_deref(), Some("First Aid"));
        assert_eq!(details.max_per_downtime, Some(3));
        assert_eq!(details.location.as_deref(), Some("Infirmary"));
        assert_eq!(details.malfunction, None);
        assert_eq!(details.salary, None);
        assert_eq!(details.prop_description.as_deref(), Some("A red box"));
        assert_eq!(details.skill_needed.as_deref(), Some("Medicine 2"));
        assert!(SeedRecord::named("Bare").to_new_item().details.is_empty());
    }

    #[test]
    fn parse_whole_is_lenient() {
        assert_eq!(parse_whole("90"), Some(90));
        assert_eq!(parse_whole(" 45 min"), Some(45));
        assert_eq!(parse_whole("0"), None);
        assert_eq!(parse_whole(""), None);
        assert_eq!(parse_whole("n/a"), None);
    }

    #[test]
    fn record_deserializes_from_camel_case() {
        let json = r#"{
            "name": "Medkit",
            "marketPrice": "200",
            "costToCraftInCredit": "85.5",
            "ressourcesNeeded": "Bandage (3)",
            "craftTimeInMinutes": "30",
            "craftTimeInDowntime": "",
            "category": "Medical",
            "location": "ignored"
        }"#;
        let record: SeedRecord = serde_json::from_str(json).expect("parse");
        let item = record.to_new_item();

        assert_eq!(item.name, "Medkit");
        assert_eq!(item.base_cost, Credits::new(dec!(85.5)));
        assert_eq!(item.base_time_minutes, 30);
        assert_eq!(item.base_time_downtime, 0);
        assert_eq!(item.market_price, Some(Credits::from_units(200)));
        assert_eq!(item.category.as_deref(), Some("Medical"));
        assert_eq!(item.description, None);
        assert_eq!(record.components(), vec![("Bandage".to_string(), 3)]);
    }

    #[test]
    fn seed_two_phases_links_forward_references() {
        let records = vec![
            record("Gizmo", "10", "Widget (2) + Sprocket (1)"),
            record("Sprocket", "", "Widget (4)"),
            record("Widget", "3", ""),
        ];
        let mut catalog = Catalog::new();

        let report = seed(&mut catalog, &records).expect("seed");

        assert_eq!(report.items_inserted, 3);
        assert_eq!(report.edges_linked, 3);
        assert!(report.warnings.is_empty());

        let gizmo = catalog.find_by_name("Gizmo").expect("find").expect("exists");
        let result = crate::Resolver::new(&catalog).resolve(gizmo).expect("resolve");
        assert_eq!(result.total_cost, Credits::from_units(28));
    }

    #[test]
    fn unknown_components_become_warnings() {
        let records = vec![record("Kit", "5", "Ghost (2) + Nut"), record("Nut", "1", "")];
        let mut catalog = Catalog::new();

        let report = seed(&mut catalog, &records).expect("seed");

        assert_eq!(report.edges_linked, 1);
        assert_eq!(
            report.warnings,
            vec!["Could not find component 'Ghost' for item 'Kit'".to_string()]
        );
    }

    #[test]
    fn zero_quantity_is_skipped_with_warning() {
        let records = vec![record("Kit", "5", "Nut (0)"), record("Nut", "1", "")];
        let mut catalog = Catalog::new();

        let report = seed(&mut catalog, &records).expect("seed");

        assert_eq!(report.edges_linked, 0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(catalog.edge_count().expect("count"), 0);
    }

    #[test]
    fn duplicate_names_keep_first_record() {
        let records = vec![record("Nut", "1", ""), record("Nut", "99", "")];
        let mut catalog = Catalog::new();

        let report = seed(&mut catalog, &records).expect("seed");

        assert_eq!(report.items_inserted, 1);
        assert_eq!(report.duplicates, 1);
        let nut = catalog.find_by_name("Nut").expect("find").expect("exists");
        let item = catalog.item(nut).expect("item").expect("exists");
        assert_eq!(item.base_cost, Credits::from_units(1));
    }

    #[test]
    fn reseeding_updates_quantities_in_place() {
        let mut catalog = Catalog::new();
        seed(
            &mut catalog,
            &[record("Kit", "5", "Nut (2)"), record("Nut", "1", "")],
        )
        .expect("seed");
        let report = seed(
            &mut catalog,
            &[record("Kit", "5", "Nut (7)"), record("Nut", "1", "")],
        )
        .expect("reseed");

        assert_eq!(report.items_inserted, 0);
        assert_eq!(report.duplicates, 2);
        let kit = catalog.find_by_name("Kit").expect("find").expect("exists");
        let edges: Vec<_> = catalog.edges_of(kit).map(|e| e.quantity).collect();
        assert_eq!(edges, vec![7]);
    }

    #[test]
    fn invalid_batch_writes_nothing() {
        let records = vec![record("Good", "1", ""), SeedRecord::named("   ")];
        let mut catalog = Catalog::new();

        assert!(matches!(
            seed(&mut catalog, &records),
            Err(BomError::InvalidItem(_))
        ));
        assert_eq!(catalog.item_count().expect("count"), 0);
    }
}
