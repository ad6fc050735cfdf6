//! Extraction pipeline
//!
//! Turns the HTML of a stabilized detail region into [`SpecRecord`]s. Pure:
//! no browser, no I/O, so every layout is testable from fixture markup.

pub mod fields;
pub mod layouts;
pub mod record;

pub use fields::{FieldLabel, match_label};
pub use layouts::{Layout, LayoutOutcome};
pub use record::{MechanicalProperty, RecordSet, SpecRecord};

use scraper::Html;
use std::collections::BTreeMap;

use crate::catalog::Source;
use crate::utils::SENTINEL_THICKNESS;

/// Who the extracted records belong to.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub source: Source,
    pub category: &'a str,
    pub material: &'a str,
}

impl<'a> ExtractionContext<'a> {
    #[must_use]
    pub fn new(source: Source, category: &'a str, material: &'a str) -> Self {
        Self {
            source,
            category,
            material,
        }
    }
}

/// Read `region_html` with the first layout that applies.
#[must_use]
pub fn analyze(region_html: &str, ctx: &ExtractionContext<'_>) -> LayoutOutcome {
    let document = Html::parse_fragment(region_html);

    if let Some(outcome) = layouts::tabbed(&document, ctx) {
        return outcome;
    }
    if let Some(outcome) = layouts::detail_panel(&document, ctx) {
        return outcome;
    }
    layouts::flat_tables(&document, ctx)
}

/// Records in `region_html`; may be empty.
#[must_use]
pub fn extract(region_html: &str, ctx: &ExtractionContext<'_>) -> Vec<SpecRecord> {
    analyze(region_html, ctx).records
}

/// Record for a material nothing could be extracted from.
#[must_use]
pub fn sentinel(ctx: &ExtractionContext<'_>) -> SpecRecord {
    SpecRecord::new(
        ctx.source,
        ctx.category,
        ctx.material,
        SENTINEL_THICKNESS,
        BTreeMap::new(),
    )
}

/// Every material yields at least one record.
#[must_use]
pub fn finish_material(mut records: Vec<SpecRecord>, ctx: &ExtractionContext<'_>) -> Vec<SpecRecord> {
    if records.is_empty() {
        records.push(sentinel(ctx));
    }
    records
}
