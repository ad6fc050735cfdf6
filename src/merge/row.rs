use serde::{Deserialize, Serialize};

use crate::extraction::{MechanicalProperty, SpecRecord};

/// Flat ten-column form of a [`SpecRecord`], as persisted and compared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogRow {
    pub category: String,
    pub material_name: String,
    pub thickness: String,
    pub effective_bend_radius: String,
    pub k_factor: String,
    pub gauge: String,
    pub minimum_flange_support: String,
    pub bend_deduction: String,
    pub maximum_bend_length: String,
    pub source: String,
}

/// Column order of the snapshot table.
pub const COLUMNS: [&str; 10] = [
    "Category",
    "MaterialName",
    "Thickness",
    "EffectiveBendRadius",
    "KFactor",
    "Gauge",
    "MinimumFlangeSupport",
    "BendDeduction",
    "MaximumBendLength",
    "Source",
];

pub(crate) type RowTuple = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
);

impl CatalogRow {
    #[must_use]
    pub fn values(&self) -> [&str; 10] {
        [
            self.category.as_str(),
            self.material_name.as_str(),
            self.thickness.as_str(),
            self.effective_bend_radius.as_str(),
            self.k_factor.as_str(),
            self.gauge.as_str(),
            self.minimum_flange_support.as_str(),
            self.bend_deduction.as_str(),
            self.maximum_bend_length.as_str(),
            self.source.as_str(),
        ]
    }
}

impl From<&SpecRecord> for CatalogRow {
    fn from(record: &SpecRecord) -> Self {
        let prop = |p| record.property(p).to_string();
        Self {
            category: record.category().to_string(),
            material_name: record.material_name().to_string(),
            thickness: record.thickness_label().to_string(),
            effective_bend_radius: prop(MechanicalProperty::EffectiveBendRadius),
            k_factor: prop(MechanicalProperty::KFactor),
            gauge: prop(MechanicalProperty::Gauge),
            minimum_flange_support: prop(MechanicalProperty::MinimumFlangeSupport),
            bend_deduction: prop(MechanicalProperty::BendDeduction),
            maximum_bend_length: prop(MechanicalProperty::MaximumBendLength),
            source: record.source().label().to_string(),
        }
    }
}

impl From<RowTuple> for CatalogRow {
    fn from(t: RowTuple) -> Self {
        Self {
            category: t.0,
            material_name: t.1,
            thickness: t.2,
            effective_bend_radius: t.3,
            k_factor: t.4,
            gauge: t.5,
            minimum_flange_support: t.6,
            bend_deduction: t.7,
            maximum_bend_length: t.8,
            source: t.9,
        }
    }
}
