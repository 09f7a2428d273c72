//! # Text Reports
//!
//! Plain-text rendering of catalog entries and crafting results.
//! JSON output bypasses this module and serializes the core types directly.

use bomcraft_core::{CraftingResult, Item, ItemDetails, ItemNode};
use std::fmt::Write;

/// Render a resolve result.
pub fn render_result(root_name: &str, result: &CraftingResult) -> String {
    let mut out = String::new();
    let title = format!("Crafting requirements: {}", root_name);
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
    let _ = writeln!(out, "Total cost:     {} credits", result.total_cost);
    let _ = writeln!(out, "Total time:     {} min", result.total_time_minutes);
    let _ = writeln!(out, "Total downtime: {}", result.total_time_downtime);

    if !result.steps.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Steps:");
        for step in &result.steps {
            let _ = writeln!(
                out,
                "  {}. {} (cost {}, {} min, downtime {})",
                step.step_number,
                step.step_component_name,
                step.cost,
                step.time_minutes,
                step.time_downtime
            );
            for component in &step.components {
                let _ = writeln!(out, "       - {} x{}", component.item_name, component.quantity);
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Breakdown:");
    for entry in &result.breakdown {
        let _ = writeln!(
            out,
            "  {} x{}: {} credits, {} min, downtime {}",
            entry.item_name, entry.quantity, entry.cost, entry.time_minutes, entry.time_downtime
        );
    }

    if !result.is_clean() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Anomalies:");
        for anomaly in &result.anomalies {
            let _ = writeln!(out, "  ! {}", anomaly);
        }
    }

    out
}

/// Render one item with its direct components.
pub fn render_item(node: &ItemNode) -> String {
    let item = &node.item;
    let mut out = String::new();
    let _ = writeln!(out, "Item {}: {}", item.id, item.name);
    if let Some(category) = &item.category {
        let _ = writeln!(out, "Category:     {}", category);
    }
    let _ = writeln!(out, "Craft cost:   {} credits", item.base_cost);
    if let Some(price) = item.market_price {
        let _ = writeln!(out, "Market price: {} credits", price);
    }
    let _ = writeln!(out, "Craft time:   {} min", item.base_time_minutes);
    let _ = writeln!(out, "Downtime:     {}", item.base_time_downtime);
    if let Some(description) = &item.description {
        let _ = writeln!(out, "Description:  {}", description);
    }
    render_details(&mut out, &item.details);

    if node.is_leaf() {
        let _ = writeln!(out, "Components:   none (base component)");
    } else {
        let _ = writeln!(out, "Components:");
        for joined in &node.components {
            match &joined.item {
                Some(component) => {
                    let _ = writeln!(
                        out,
                        "  - {} x{} (id {})",
                        component.name, joined.edge.quantity, component.id
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "  - <missing item {}> x{}",
                        joined.edge.component, joined.edge.quantity
                    );
                }
            }
        }
    }
    out
}

fn render_details(out: &mut String, details: &ItemDetails) {
    let text_fields = [
        ("Prerequisites", &details.prerequisites),
        ("Location", &details.location),
        ("Malfunction", &details.malfunction),
        ("Skill needed", &details.skill_needed),
        ("Prop", &details.prop_description),
    ];
    for (label, value) in text_fields {
        if let Some(value) = value {
            let _ = writeln!(out, "{:<13} {}", format!("{}:", label), value);
        }
    }
    if let Some(max) = details.max_per_downtime {
        let _ = writeln!(out, "Max/downtime: {}", max);
    }
    if let Some(salary) = details.salary {
        let _ = writeln!(out, "Salary:       {}", salary);
    }
}

/// Render a one-line-per-item listing.
pub fn render_item_list(items: &[Item]) -> String {
    let mut out = String::new();
    for item in items {
        let category = item.category.as_deref().unwrap_or("-");
        let _ = writeln!(
            out,
            "{:>5}  {:<32} {:<16} {} credits",
            item.id.0, item.name, category, item.base_cost
        );
    }
    let _ = writeln!(out, "{} item(s)", items.len());
    out
}
