use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::catalog::Source;

/// Mechanical properties recognized in detail tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MechanicalProperty {
    EffectiveBendRadius,
    KFactor,
    Gauge,
    MinimumFlangeSupport,
    BendDeduction,
    MaximumBendLength,
}

impl MechanicalProperty {
    /// Column order of the persisted snapshot.
    pub const ALL: [Self; 6] = [
        Self::EffectiveBendRadius,
        Self::KFactor,
        Self::Gauge,
        Self::MinimumFlangeSupport,
        Self::BendDeduction,
        Self::MaximumBendLength,
    ];

    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::EffectiveBendRadius => "EffectiveBendRadius",
            Self::KFactor => "KFactor",
            Self::Gauge => "Gauge",
            Self::MinimumFlangeSupport => "MinimumFlangeSupport",
            Self::BendDeduction => "BendDeduction",
            Self::MaximumBendLength => "MaximumBendLength",
        }
    }
}

impl fmt::Display for MechanicalProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One normalized specification row: a material at one thickness.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRecord {
    category: String,
    material_name: String,
    thickness_label: String,
    properties: BTreeMap<MechanicalProperty, String>,
    source: Source,
}

impl SpecRecord {
    #[must_use]
    pub fn new(
        source: Source,
        category: impl Into<String>,
        material_name: impl Into<String>,
        thickness_label: impl Into<String>,
        properties: BTreeMap<MechanicalProperty, String>,
    ) -> Self {
        Self {
            category: category.into(),
            material_name: material_name.into(),
            thickness_label: thickness_label.into(),
            properties,
            source,
        }
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn material_name(&self) -> &str {
        &self.material_name
    }

    #[must_use]
    pub fn thickness_label(&self) -> &str {
        &self.thickness_label
    }

    #[must_use]
    pub fn source(&self) -> Source {
        self.source
    }

    #[must_use]
    pub fn properties(&self) -> &BTreeMap<MechanicalProperty, String> {
        &self.properties
    }

    /// Property value, empty when not extracted.
    #[must_use]
    pub fn property(&self, property: MechanicalProperty) -> &str {
        self.properties.get(&property).map_or("", String::as_str)
    }

    /// Run-level identity: `(category, material, thickness)`.
    #[must_use]
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.category, &self.material_name, &self.thickness_label)
    }
}

/// Ordered record collection, unique on [`SpecRecord::key`].
///
/// The first record for a key wins; later duplicates are dropped.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<SpecRecord>,
    keys: HashSet<(String, String, String)>,
}

impl RecordSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is taken. Returns whether it was kept.
    pub fn insert(&mut self, record: SpecRecord) -> bool {
        let (category, material, thickness) = record.key();
        let key = (category.to_string(), material.to_string(), thickness.to_string());
        if !self.keys.insert(key) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Insert every record, returning how many were kept.
    pub fn extend<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = SpecRecord>,
    {
        records
            .into_iter()
            .map(|r| self.insert(r))
            .filter(|kept| *kept)
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SpecRecord> {
        self.records.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<SpecRecord> {
        self.records
    }
}

impl FromIterator<SpecRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = SpecRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(thickness: &str, gauge: &str) -> SpecRecord {
        let mut props = BTreeMap::new();
        props.insert(MechanicalProperty::Gauge, gauge.to_string());
        SpecRecord::new(Source::SendCutSend, "Steel", "Mild Steel", thickness, props)
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let mut set = RecordSet::new();
        assert!(set.insert(record("0.060", "16")));
        assert!(!set.insert(record("0.060", "99")));
        assert!(set.insert(record("0.120", "11")));

        let records = set.into_vec();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].property(MechanicalProperty::Gauge), "16");
        assert_eq!(records[1].thickness_label(), "0.120");
    }

    #[test]
    fn missing_property_reads_empty() {
        let r = record("0.060", "16");
        assert_eq!(r.property(MechanicalProperty::KFactor), "");
    }
}
