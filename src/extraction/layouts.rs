//! Detail-region layouts, tried in order: tabbed, detail panel, flat tables

use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use super::ExtractionContext;
use super::fields::{TableFields, cell_text, clean_value, parse_table};
use super::record::SpecRecord;

static TAB_BUTTON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("button.e-n-tab-title").expect("Invalid tab button selector"));
static TAB_LABEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.e-n-tab-title-text").expect("Invalid tab label selector"));
static WITH_ID: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[id]").expect("Invalid id selector"));
static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").expect("Invalid table selector"));
static PROPERTY_TABLES: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("table.metalProperties, table.MaterialBendTable").expect("Invalid property table selector")
});
static THICKNESS_HEADER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".materialActionBar .subHeader").expect("Invalid thickness header selector")
});

/// Structural layout a detail region was read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Tabbed,
    DetailPanel,
    FlatTables,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tabbed => "tabbed",
            Self::DetailPanel => "detail panel",
            Self::FlatTables => "flat tables",
        })
    }
}

/// Records plus notes on what was skipped and why.
#[derive(Debug, Clone)]
pub struct LayoutOutcome {
    pub layout: Layout,
    pub records: Vec<SpecRecord>,
    pub notes: Vec<String>,
}

fn has_inch_mark(text: &str) -> bool {
    text.contains('"')
}

fn record(ctx: &ExtractionContext<'_>, thickness: String, fields: TableFields) -> SpecRecord {
    SpecRecord::new(ctx.source, ctx.category, ctx.material, thickness, fields.properties)
}

/// Tab buttons labelled in inches, each table of the controlled panel one
/// record. `None` when no tab qualifies.
pub(super) fn tabbed(document: &Html, ctx: &ExtractionContext<'_>) -> Option<LayoutOutcome> {
    let mut notes = Vec::new();
    let mut tabs: Vec<(String, String)> = Vec::new();

    for button in document.select(&TAB_BUTTON) {
        let Some(label) = button.select(&TAB_LABEL).next().map(cell_text) else {
            continue;
        };
        if !has_inch_mark(&label) {
            notes.push(format!("tab '{label}' skipped: thickness unknown"));
            continue;
        }
        let Some(panel_id) = button.value().attr("aria-controls") else {
            notes.push(format!("tab '{label}' has no panel reference"));
            continue;
        };
        tabs.push((clean_value(&label), panel_id.to_string()));
    }

    if tabs.is_empty() {
        return None;
    }

    let panels: HashMap<&str, ElementRef<'_>> = document
        .select(&WITH_ID)
        .filter_map(|el| el.value().id().map(|id| (id, el)))
        .collect();

    let mut records = Vec::new();
    for (thickness, panel_id) in tabs {
        let Some(panel) = panels.get(panel_id.as_str()) else {
            notes.push(format!("panel '{panel_id}' for {thickness} not found"));
            continue;
        };
        let tables: Vec<ElementRef<'_>> = panel.select(&TABLE).collect();
        if tables.is_empty() {
            notes.push(format!("no property tables for thickness {thickness}"));
        }
        for table in tables {
            records.push(record(ctx, thickness.clone(), parse_table(table)));
        }
    }

    Some(LayoutOutcome {
        layout: Layout::Tabbed,
        records,
        notes,
    })
}

/// A single thickness header; the property and bend tables feed one record.
///
/// A header without an inch value is "thickness unknown": the panel yields
/// no record.
pub(super) fn detail_panel(document: &Html, ctx: &ExtractionContext<'_>) -> Option<LayoutOutcome> {
    let header = document.select(&THICKNESS_HEADER).next().map(cell_text)?;
    let inches = header.split_once('"').map(|(value, _)| clean_value(value));
    let Some(thickness) = inches.filter(|t| !t.is_empty()) else {
        return Some(LayoutOutcome {
            layout: Layout::DetailPanel,
            records: Vec::new(),
            notes: vec![format!("header '{header}' skipped: thickness unknown")],
        });
    };

    let mut fields = TableFields::default();
    for table in document.select(&PROPERTY_TABLES) {
        fields.absorb(parse_table(table));
    }

    Some(LayoutOutcome {
        layout: Layout::DetailPanel,
        records: vec![record(ctx, thickness, fields)],
        notes: Vec::new(),
    })
}

/// Each table a record, thickness from its advertised-thickness row.
pub(super) fn flat_tables(document: &Html, ctx: &ExtractionContext<'_>) -> LayoutOutcome {
    let mut records = Vec::new();
    let mut notes = Vec::new();

    for table in document.select(&TABLE) {
        let mut fields = parse_table(table);
        match fields.advertised_thickness.take() {
            Some(raw) if has_inch_mark(&raw) => records.push(record(ctx, clean_value(&raw), fields)),
            Some(raw) => notes.push(format!("thickness '{raw}' is not in inches, table skipped")),
            None => notes.push("table without advertised thickness skipped".to_string()),
        }
    }

    LayoutOutcome {
        layout: Layout::FlatTables,
        records,
        notes,
    }
}
