//! SQLite snapshot of the last run's rows

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use super::row::{COLUMNS, RowTuple};
use super::{CatalogRow, StoreError};
use crate::utils::SNAPSHOT_TABLE;

/// Primary SQLite result codes for a file that is not a usable database.
const SQLITE_CORRUPT: i32 = 11;
const SQLITE_NOTADB: i32 = 26;

fn column_defs() -> String {
    COLUMNS
        .iter()
        .map(|c| format!("{c} TEXT"))
        .collect::<Vec<_>>()
        .join(", ")
}

static ENSURE_SQL: LazyLock<String> =
    LazyLock::new(|| format!("CREATE TABLE IF NOT EXISTS {SNAPSHOT_TABLE} ({})", column_defs()));
static CREATE_SQL: LazyLock<String> =
    LazyLock::new(|| format!("CREATE TABLE {SNAPSHOT_TABLE} ({})", column_defs()));
static DROP_SQL: LazyLock<String> = LazyLock::new(|| format!("DROP TABLE IF EXISTS {SNAPSHOT_TABLE}"));
static SELECT_SQL: LazyLock<String> =
    LazyLock::new(|| format!("SELECT {} FROM {SNAPSHOT_TABLE} ORDER BY rowid", COLUMNS.join(", ")));
static INSERT_SQL: LazyLock<String> = LazyLock::new(|| {
    format!(
        "INSERT INTO {SNAPSHOT_TABLE} ({}) VALUES ({})",
        COLUMNS.join(", "),
        vec!["?"; COLUMNS.len()].join(", ")
    )
});

/// True when SQLite rejected the file itself rather than a statement.
fn is_unreadable_file(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db) = err else {
        return false;
    };
    db.code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, SQLITE_CORRUPT | SQLITE_NOTADB))
}

/// Rename an unreadable database out of the way and drop its journal files.
async fn move_aside(path: &Path) -> io::Result<PathBuf> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot.db".to_string());
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let target = path.with_file_name(format!("{file_name}.unreadable-{stamp}"));
    tokio::fs::rename(path, &target).await?;

    for suffix in ["-wal", "-shm"] {
        let journal = path.with_file_name(format!("{file_name}{suffix}"));
        if let Err(e) = tokio::fs::remove_file(&journal).await
            && e.kind() != io::ErrorKind::NotFound
        {
            log::warn!("Could not remove {}: {e}", journal.display());
        }
    }
    Ok(target)
}

async fn connect(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await?;

    if let Err(e) = sqlx::query(ENSURE_SQL.as_str()).execute(&pool).await {
        pool.close().await;
        return Err(e);
    }
    Ok(pool)
}

/// Persisted snapshot of the merged dataset.
#[derive(Clone)]
pub struct SnapshotStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl SnapshotStore {
    /// Open or create the database at `path`.
    ///
    /// A file SQLite cannot read as a database is renamed to
    /// `<name>.unreadable-<timestamp>` and a fresh store is created in its
    /// place, so the previous snapshot reads as empty.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let open_err = |source: sqlx::Error| StoreError::Open {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| open_err(sqlx::Error::Io(e)))?;
        }

        let pool = match connect(path).await {
            Ok(pool) => pool,
            Err(e) if is_unreadable_file(&e) && path.exists() => {
                let moved = move_aside(path)
                    .await
                    .map_err(|io| open_err(sqlx::Error::Io(io)))?;
                log::warn!(
                    "{} is not a readable snapshot ({e}); moved to {} and starting empty",
                    path.display(),
                    moved.display()
                );
                connect(path).await.map_err(open_err)?
            }
            Err(e) => return Err(open_err(e)),
        };

        log::debug!("Snapshot store opened at {}", path.display());
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All rows of the current snapshot, in insertion order.
    pub async fn load(&self) -> Result<Vec<CatalogRow>, StoreError> {
        let rows: Vec<RowTuple> = sqlx::query_as(SELECT_SQL.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Read)?;
        Ok(rows.into_iter().map(CatalogRow::from).collect())
    }

    /// Atomically replace the snapshot with `rows`.
    ///
    /// The table is dropped and recreated, so a table left behind with a
    /// different column layout is replaced too.
    pub async fn replace(&self, rows: &[CatalogRow]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::Write)?;

        for ddl in [DROP_SQL.as_str(), CREATE_SQL.as_str()] {
            sqlx::query(ddl)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::Write)?;
        }

        for row in rows {
            let mut query = sqlx::query(INSERT_SQL.as_str());
            for value in row.values() {
                query = query.bind(value);
            }
            query.execute(&mut *tx).await.map_err(StoreError::Write)?;
        }

        tx.commit().await.map_err(StoreError::Write)?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(material: &str, gauge: &str) -> CatalogRow {
        CatalogRow {
            category: "Steel".into(),
            material_name: material.into(),
            thickness: "0.060".into(),
            gauge: gauge.into(),
            source: "SendCutSend".into(),
            ..CatalogRow::default()
        }
    }

    #[tokio::test]
    async fn replace_then_load_round_trips_in_order() {
        let dir = TempDir::new().expect("tempdir");
        let store = SnapshotStore::open(&dir.path().join("materials.db"))
            .await
            .expect("open");

        assert!(store.load().await.expect("load empty").is_empty());

        let rows = vec![row("Mild Steel", "16"), row("Stainless 304", "16"), row("AR500", "")];
        store.replace(&rows).await.expect("replace");
        assert_eq!(store.load().await.expect("load"), rows);

        store.replace(&rows[1..]).await.expect("replace again");
        assert_eq!(store.load().await.expect("load"), rows[1..].to_vec());
    }

    #[tokio::test]
    async fn reopening_keeps_the_snapshot() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("materials.db");
        {
            let store = SnapshotStore::open(&path).await.expect("open");
            store.replace(&[row("Mild Steel", "16")]).await.expect("replace");
            store.close().await;
        }
        let store = SnapshotStore::open(&path).await.expect("reopen");
        assert_eq!(store.load().await.expect("load"), vec![row("Mild Steel", "16")]);
    }

    #[tokio::test]
    async fn file_that_is_not_a_database_is_moved_aside() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("materials.db");
        std::fs::write(&path, vec![0xA5u8; 4096]).expect("write garbage");

        let store = SnapshotStore::open(&path).await.expect("open recovers");
        assert!(store.load().await.expect("load").is_empty());
        store.replace(&[row("Mild Steel", "16")]).await.expect("replace");
        assert_eq!(store.load().await.expect("load"), vec![row("Mild Steel", "16")]);
        assert_eq!(store.path(), path.as_path());
        store.close().await;

        let kept: Vec<String> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("materials.db.unreadable-"))
            .collect();
        assert_eq!(kept.len(), 1, "garbage file preserved next to the new store");
    }

    #[tokio::test]
    async fn replace_recreates_a_table_with_foreign_columns() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("materials.db");
        {
            let options = SqliteConnectOptions::new().filename(&path).create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .connect_with(options)
                .await
                .expect("legacy connect");
            sqlx::query(
                r#"CREATE TABLE materials_combined ("Material Name" TEXT, "Thickness Name" TEXT, "K-factor" REAL)"#,
            )
            .execute(&pool)
            .await
            .expect("legacy table");
            sqlx::query(r#"INSERT INTO materials_combined VALUES ('A36', '0.250"', 0.45)"#)
                .execute(&pool)
                .await
                .expect("legacy row");
            pool.close().await;
        }

        let store = SnapshotStore::open(&path).await.expect("open");
        assert!(matches!(store.load().await, Err(StoreError::Read(_))));

        store.replace(&[row("AR500", "")]).await.expect("replace");
        assert_eq!(store.load().await.expect("load"), vec![row("AR500", "")]);
    }
}
