use std::fmt;
use std::sync::{Arc, Weak};

/// Level of a node in the traversal hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Category,
    Material,
    Variant,
}

/// A named node in the category/material/variant hierarchy.
///
/// The display name is the only identifier the catalogs expose. Parents are
/// held weakly; the navigator owns the chain for as long as it is positioned
/// under that entity.
#[derive(Debug)]
pub struct CatalogEntity {
    kind: EntityKind,
    display_name: String,
    parent: Option<Weak<CatalogEntity>>,
}

impl CatalogEntity {
    #[must_use]
    pub fn category(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            kind: EntityKind::Category,
            display_name: name.into(),
            parent: None,
        })
    }

    #[must_use]
    pub fn child(parent: &Arc<Self>, kind: EntityKind, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            display_name: name.into(),
            parent: Some(Arc::downgrade(parent)),
        })
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Breadcrumb from the root, e.g. `Aluminum / 5052 H32 / #2`.
    #[must_use]
    pub fn path(&self) -> String {
        let mut parts = vec![self.display_name.clone()];
        let mut cursor = self.parent();
        while let Some(node) = cursor {
            parts.push(node.display_name.clone());
            cursor = node.parent();
        }
        parts.reverse();
        parts.join(" / ")
    }

    /// Name-based identity: two entities are the same if kind and name match.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.kind == other.kind && self.display_name == other.display_name
    }
}

impl fmt::Display for CatalogEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_walks_weak_parents() {
        let cat = CatalogEntity::category("Aluminum");
        let mat = CatalogEntity::child(&cat, EntityKind::Material, "5052 H32");
        let var = CatalogEntity::child(&mat, EntityKind::Variant, "#2");
        assert_eq!(var.path(), "Aluminum / 5052 H32 / #2");
        assert!(var.parent().is_some_and(|p| p.same_as(&mat)));
    }

    #[test]
    fn dropped_parent_is_not_kept_alive() {
        let mat = {
            let cat = CatalogEntity::category("Steel");
            CatalogEntity::child(&cat, EntityKind::Material, "A36")
        };
        assert!(mat.parent().is_none());
        assert_eq!(mat.path(), "A36");
    }
}
