use std::fmt;

use crate::extraction::SpecRecord;

/// States of the catalog traversal.
///
/// `AtMaterialExpanded` and `AtDetailModal` carry the records harvested so
/// far for the current material; they are flushed when the material finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    Idle,
    AtCategoryList,
    AtCategory {
        category: String,
    },
    AtMaterialExpanded {
        category: String,
        material: String,
        variants: usize,
        next_variant: usize,
        harvested: Vec<SpecRecord>,
    },
    AtDetailModal {
        category: String,
        material: String,
        variant: usize,
        variants: usize,
        harvested: Vec<SpecRecord>,
    },
    AllCategoriesProcessed,
}

impl NavState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AllCategoriesProcessed)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::AtCategoryList => "AtCategoryList",
            Self::AtCategory { .. } => "AtCategory",
            Self::AtMaterialExpanded { .. } => "AtMaterialExpanded",
            Self::AtDetailModal { .. } => "AtDetailModal",
            Self::AllCategoriesProcessed => "AllCategoriesProcessed",
        }
    }
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtCategory { category } => write!(f, "AtCategory({category})"),
            Self::AtMaterialExpanded {
                category,
                material,
                next_variant,
                variants,
                ..
            } => write!(f, "AtMaterialExpanded({category}, {material}, {next_variant}/{variants})"),
            Self::AtDetailModal {
                category,
                material,
                variant,
                ..
            } => write!(f, "AtDetailModal({category}, {material}, #{})", variant + 1),
            other => f.write_str(other.name()),
        }
    }
}
