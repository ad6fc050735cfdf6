use std::collections::HashSet;

use super::CatalogRow;

/// Outcome of comparing a fresh run against the stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// What the store will hold afterwards: exactly the new rows.
    pub merged: Vec<CatalogRow>,
    /// New rows with no identical row in the snapshot, in new-row order.
    pub added: Vec<CatalogRow>,
}

/// Full-replace merge: the new rows win wholesale, and only additions are
/// reported. Rows missing from the new run are dropped silently.
#[must_use]
pub fn reconcile(new_rows: &[CatalogRow], previous: &[CatalogRow]) -> Reconciliation {
    let known: HashSet<&CatalogRow> = previous.iter().collect();
    let added = new_rows
        .iter()
        .filter(|row| !known.contains(row))
        .cloned()
        .collect();
    Reconciliation {
        merged: new_rows.to_vec(),
        added,
    }
}
