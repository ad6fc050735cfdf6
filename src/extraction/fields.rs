//! Row-level field recognition inside detail tables

use scraper::{ElementRef, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::record::MechanicalProperty;
use crate::utils::collapse_whitespace;

static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("Invalid row selector"));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").expect("Invalid cell selector"));
static TABLE_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.tableTitle").expect("Invalid table title selector"));

/// What a row label means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel {
    Property(MechanicalProperty),
    AdvertisedThickness,
}

/// Match a row label case-insensitively by substring.
#[must_use]
pub fn match_label(label: &str) -> Option<FieldLabel> {
    let key = label.to_lowercase();
    let property = if key.contains("advertised thickness") {
        return Some(FieldLabel::AdvertisedThickness);
    } else if key.contains("k factor") || key.contains("k-factor") {
        MechanicalProperty::KFactor
    } else if key.contains("effective bend radius") {
        MechanicalProperty::EffectiveBendRadius
    } else if key.contains("gauge") {
        MechanicalProperty::Gauge
    } else if key.contains("bend deduction") {
        MechanicalProperty::BendDeduction
    } else if key.contains("minimum flange") {
        MechanicalProperty::MinimumFlangeSupport
    } else if key.contains("maximum bend length") {
        MechanicalProperty::MaximumBendLength
    } else {
        return None;
    };
    Some(FieldLabel::Property(property))
}

/// Trim, collapse whitespace, and drop inch marks.
#[must_use]
pub fn clean_value(raw: &str) -> String {
    collapse_whitespace(&raw.replace('"', ""))
}

pub(crate) fn cell_text(cell: ElementRef<'_>) -> String {
    collapse_whitespace(&cell.text().collect::<String>())
}

/// Fields found in one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFields {
    pub properties: BTreeMap<MechanicalProperty, String>,
    /// Raw advertised thickness, inch mark included.
    pub advertised_thickness: Option<String>,
}

impl TableFields {
    fn set(&mut self, property: MechanicalProperty, value: String) {
        if value.is_empty() {
            return;
        }
        self.properties.entry(property).or_insert(value);
    }

    /// Merge `other` in; values already present win.
    pub fn absorb(&mut self, other: TableFields) {
        for (property, value) in other.properties {
            self.set(property, value);
        }
        if self.advertised_thickness.is_none() {
            self.advertised_thickness = other.advertised_thickness;
        }
    }
}

/// Extract recognized fields from one `<table>`.
///
/// A table titled with a recognized label (a `td.tableTitle` cell or a
/// single-cell first row) contributes its whole remaining grid to that
/// property. Otherwise each two-cell row is matched on its first cell;
/// rows with unrecognized labels are ignored.
#[must_use]
pub fn parse_table(table: ElementRef<'_>) -> TableFields {
    if let Some(fields) = parse_titled_grid(table) {
        return fields;
    }

    let mut fields = TableFields::default();
    for row in table.select(&ROW) {
        let cells: Vec<String> = row.select(&CELL).map(cell_text).collect();
        let [label, value] = cells.as_slice() else {
            continue;
        };
        match match_label(label) {
            Some(FieldLabel::Property(property)) => fields.set(property, clean_value(value)),
            Some(FieldLabel::AdvertisedThickness) => {
                if fields.advertised_thickness.is_none() {
                    fields.advertised_thickness = Some(value.clone());
                }
            }
            None => {}
        }
    }
    fields
}

fn parse_titled_grid(table: ElementRef<'_>) -> Option<TableFields> {
    let rows: Vec<ElementRef<'_>> = table.select(&ROW).collect();

    let (title, skip_first_row) = if let Some(cell) = table.select(&TABLE_TITLE).next() {
        (cell_text(cell), false)
    } else {
        let first = rows.first()?;
        let cells: Vec<ElementRef<'_>> = first.select(&CELL).collect();
        match cells.as_slice() {
            [only] => (cell_text(*only), true),
            _ => return None,
        }
    };

    let Some(FieldLabel::Property(property)) = match_label(&title) else {
        return None;
    };

    let grid: Vec<String> = rows
        .iter()
        .skip(usize::from(skip_first_row))
        .filter_map(|row| {
            let cells: Vec<String> = row
                .select(&CELL)
                .filter(|cell| !cell.value().classes().any(|c| c == "tableTitle"))
                .map(cell_text)
                .collect();
            (!cells.is_empty() && cells.iter().any(|c| !c.is_empty())).then(|| cells.join(" | "))
        })
        .collect();

    let mut fields = TableFields::default();
    fields.set(property, clean_value(&grid.join("; ")));
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first_table(html: &str) -> TableFields {
        let doc = Html::parse_fragment(html);
        let selector = Selector::parse("table").expect("selector");
        parse_table(doc.select(&selector).next().expect("table"))
    }

    #[test]
    fn label_matching_is_case_insensitive_substring() {
        assert_eq!(
            match_label("K-Factor"),
            Some(FieldLabel::Property(MechanicalProperty::KFactor))
        );
        assert_eq!(
            match_label("Effective Bend Radius @90°"),
            Some(FieldLabel::Property(MechanicalProperty::EffectiveBendRadius))
        );
        assert_eq!(match_label("Advertised Thickness"), Some(FieldLabel::AdvertisedThickness));
        assert_eq!(match_label("Tolerance"), None);
    }

    #[test]
    fn unrecognized_rows_contribute_nothing() {
        let fields = first_table(
            r#"<table>
                 <tr><td>Gauge</td><td>16</td></tr>
                 <tr><td>Surface finish</td><td>Mill</td></tr>
                 <tr><td>K factor</td><td> 0.42 </td></tr>
                 <tr><td>Only one cell</td></tr>
               </table>"#,
        );
        assert_eq!(fields.properties.len(), 2);
        assert_eq!(fields.properties[&MechanicalProperty::Gauge], "16");
        assert_eq!(fields.properties[&MechanicalProperty::KFactor], "0.42");
    }

    #[test]
    fn inch_marks_are_stripped_from_values() {
        let fields = first_table(
            r#"<table><tr><th>Effective bend radius</th><td>0.030"</td></tr>
                      <tr><td>Advertised Thickness</td><td>0.125"</td></tr></table>"#,
        );
        assert_eq!(fields.properties[&MechanicalProperty::EffectiveBendRadius], "0.030");
        assert_eq!(fields.advertised_thickness.as_deref(), Some("0.125\""));
    }

    #[test]
    fn titled_grid_joins_cells_and_rows() {
        let fields = first_table(
            r#"<table class="MaterialBendTable">
                 <tr><td class="tableTitle">Bend Deduction</td></tr>
                 <tr><td>Angle</td><td>90°</td><td>45°</td></tr>
                 <tr><td>Value</td><td>0.052"</td><td>0.021"</td></tr>
               </table>"#,
        );
        assert_eq!(
            fields.properties[&MechanicalProperty::BendDeduction],
            "Angle | 90° | 45°; Value | 0.052 | 0.021"
        );
    }

    #[test]
    fn single_cell_first_row_acts_as_title() {
        let fields = first_table(
            r#"<table><tr><th>Minimum Flange</th></tr><tr><td>0.25"</td><td>0.31"</td></tr></table>"#,
        );
        assert_eq!(
            fields.properties[&MechanicalProperty::MinimumFlangeSupport],
            "0.25 | 0.31"
        );
    }
}
