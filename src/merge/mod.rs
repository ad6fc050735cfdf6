//! Diff & merge engine
//!
//! Compares a run's records with the persisted snapshot, reports the added
//! rows, and replaces the snapshot with the new run in one transaction.

pub mod reconcile;
pub mod row;
pub mod store;

pub use reconcile::{Reconciliation, reconcile};
pub use row::{COLUMNS, CatalogRow};
pub use store::SnapshotStore;

use serde::Serialize;
use std::path::PathBuf;

use crate::extraction::SpecRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not open snapshot store {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("could not read snapshot: {0}")]
    Read(#[source] sqlx::Error),

    #[error("could not write snapshot: {0}")]
    Write(#[source] sqlx::Error),
}

/// What a run added relative to the previous snapshot. Returned to the
/// caller, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
    pub added_count: usize,
    pub added_rows: Vec<CatalogRow>,
}

/// Reconcile `records` against the store and replace the snapshot.
///
/// An unreadable snapshot is treated as empty, so every row is reported as
/// added; a failed write is an error.
pub async fn commit(store: &SnapshotStore, records: &[SpecRecord]) -> Result<ChangeReport, StoreError> {
    let new_rows: Vec<CatalogRow> = records.iter().map(CatalogRow::from).collect();

    let previous = match store.load().await {
        Ok(rows) => rows,
        Err(e) => {
            log::warn!("{e}; treating the previous snapshot as empty");
            Vec::new()
        }
    };

    let Reconciliation { merged, added } = reconcile(&new_rows, &previous);
    store.replace(&merged).await?;

    log::info!(
        "Snapshot {} replaced: {} rows stored, {} new rows added",
        store.path().display(),
        merged.len(),
        added.len()
    );
    Ok(ChangeReport {
        added_count: added.len(),
        added_rows: added,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Source;
    use crate::extraction::MechanicalProperty;
    use std::collections::BTreeMap;

    fn record(material: &str, k: &str) -> SpecRecord {
        let mut props = BTreeMap::new();
        props.insert(MechanicalProperty::KFactor, k.to_string());
        SpecRecord::new(Source::OshCut, "Aluminum", material, "0.125", props)
    }

    #[tokio::test]
    async fn commit_reports_only_new_rows_and_replaces_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::open(&dir.path().join("materials.db"))
            .await
            .expect("open");

        let first = commit(&store, &[record("5052", "0.44"), record("6061", "0.42")])
            .await
            .expect("first commit");
        assert_eq!(first.added_count, 2);

        let second = commit(&store, &[record("5052", "0.44"), record("3003", "0.40")])
            .await
            .expect("second commit");
        assert_eq!(second.added_count, 1);
        assert_eq!(second.added_rows[0].material_name, "3003");
        assert_eq!(second.added_rows[0].source, "OSH Cut");

        let stored = store.load().await.expect("load");
        let names: Vec<&str> = stored.iter().map(|r| r.material_name.as_str()).collect();
        assert_eq!(names, ["5052", "3003"]);
    }

    #[tokio::test]
    async fn unreadable_previous_snapshot_counts_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("materials.db");
        {
            let pool = sqlx::sqlite::SqlitePoolOptions::new()
                .connect_with(
                    sqlx::sqlite::SqliteConnectOptions::new()
                        .filename(&path)
                        .create_if_missing(true),
                )
                .await
                .expect("connect");
            sqlx::query(r#"CREATE TABLE materials_combined ("Material Name" TEXT, "K-factor" TEXT)"#)
                .execute(&pool)
                .await
                .expect("older layout");
            sqlx::query("INSERT INTO materials_combined VALUES ('5052', '0.44')")
                .execute(&pool)
                .await
                .expect("older row");
            pool.close().await;
        }

        let store = SnapshotStore::open(&path).await.expect("open");
        let report = commit(&store, &[record("5052", "0.44"), record("6061", "0.42")])
            .await
            .expect("commit despite unreadable snapshot");
        assert_eq!(report.added_count, 2);

        let stored = store.load().await.expect("load");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].k_factor, "0.44");
    }
}
