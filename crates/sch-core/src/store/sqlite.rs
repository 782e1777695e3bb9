//! SQLite-backed schema store

use super::{SchemaStore, SnapshotInfo};
use crate::column::{ColumnAttributes, ColumnDefinition};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction};
use std::path::{Path, PathBuf};

/// Store file used when none is given
pub const DEFAULT_DB_PATH: &str = "schema.db";

const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS schema_def (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        table_name TEXT NOT NULL,
        column_name TEXT NOT NULL,
        type_id TEXT NOT NULL,
        size TEXT NOT NULL,
        position TEXT NOT NULL,
        UNIQUE(table_name, column_name)
    );
    CREATE TABLE IF NOT EXISTS schema_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

const DROP_TABLES: &str = "
    DROP TABLE IF EXISTS schema_def;
    DROP TABLE IF EXISTS schema_meta;
";

const META_LOADED_AT: &str = "loaded_at";
const META_SOURCE: &str = "source";
const META_COLUMN_COUNT: &str = "column_count";

/// Schema store persisted in a single SQLite file
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) a store file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| Error::StoreOpen {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::init(conn, path.to_path_buf())
    }

    /// Open a store that must already exist.
    ///
    /// Unlike [`SqliteStore::open`] this never creates the file, and fails
    /// with [`Error::StoreOpen`] when the file holds no `schema_def` table.
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let store_open = |e| Error::StoreOpen {
            path: path.to_path_buf(),
            source: e,
        };

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(store_open)?;
        // "no such table" on a file that was never loaded
        conn.prepare("SELECT 1 FROM schema_def").map_err(store_open)?;

        Self::init(conn, path.to_path_buf())
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|e| Error::StoreOpen {
            path: path.clone(),
            source: e,
        })?;
        Self::init(conn, path)
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch(CREATE_TABLES).map_err(|e| Error::StoreOpen {
            path: path.clone(),
            source: e,
        })?;
        log::debug!("opened schema store {}", path.display());
        Ok(Self { conn, path })
    }

    /// Path of the underlying database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop and recreate the store tables, then load `records`.
    ///
    /// Runs as one transaction, so a failure leaves the old tables intact.
    pub fn reset(
        &mut self,
        records: &[ColumnDefinition],
        source: Option<&Path>,
    ) -> Result<usize> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| Error::store_write("could not begin transaction", e))?;

        tx.execute_batch(DROP_TABLES)
            .and_then(|_| tx.execute_batch(CREATE_TABLES))
            .map_err(|e| Error::store_write("could not recreate store tables", e))?;

        let count = insert_all(&tx, records, source)?;

        tx.commit().map_err(|e| Error::store_write("could not commit reset", e))?;
        log::info!("reset {} and stored {} column(s)", self.path.display(), count);
        Ok(count)
    }
}

/// Insert every record plus snapshot metadata inside an open transaction
fn insert_all(
    tx: &Transaction<'_>,
    records: &[ColumnDefinition],
    source: Option<&Path>,
) -> Result<usize> {
    let mut stmt = tx
        .prepare(
            "INSERT INTO schema_def (table_name, column_name, type_id, size, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(|e| Error::store_write("could not prepare insert", e))?;

    for def in records {
        stmt.execute(params![
            def.table,
            def.column,
            def.type_id,
            def.size,
            def.position
        ])
        .map_err(|e| Error::store_write(format!("could not insert {}", def.key()), e))?;
    }

    let mut meta = tx
        .prepare("INSERT OR REPLACE INTO schema_meta (key, value) VALUES (?1, ?2)")
        .map_err(|e| Error::store_write("could not prepare metadata update", e))?;

    let loaded_at = Utc::now().to_rfc3339();
    let count = records.len().to_string();
    meta.execute(params![META_LOADED_AT, loaded_at])
        .and_then(|_| meta.execute(params![META_COLUMN_COUNT, count]))
        .map_err(|e| Error::store_write("could not write snapshot metadata", e))?;

    let written = match source {
        Some(source) => {
            meta.execute(params![META_SOURCE, source.to_string_lossy().into_owned()])
        }
        None => tx.execute("DELETE FROM schema_meta WHERE key = ?1", params![META_SOURCE]),
    };
    written.map_err(|e| Error::store_write("could not write snapshot metadata", e))?;

    Ok(records.len())
}

impl SchemaStore for SqliteStore {
    fn bulk_replace(
        &mut self,
        records: &[ColumnDefinition],
        source: Option<&Path>,
    ) -> Result<usize> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| Error::store_write("could not begin transaction", e))?;

        tx.execute("DELETE FROM schema_def", [])
            .map_err(|e| Error::store_write("could not clear existing columns", e))?;

        let count = insert_all(&tx, records, source)?;

        tx.commit().map_err(|e| Error::store_write("could not commit load", e))?;
        log::info!("stored {} column(s) in {}", count, self.path.display());
        Ok(count)
    }

    fn lookup(&self, table: &str, column: &str) -> Result<Option<ColumnAttributes>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT type_id, size, position
             FROM schema_def
             WHERE table_name = ?1 AND column_name = ?2",
        )?;

        let attrs = stmt
            .query_row(params![table, column], |row| {
                Ok(ColumnAttributes::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .optional()?;
        Ok(attrs)
    }

    fn list_all(&self) -> Result<Vec<ColumnDefinition>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name, column_name, type_id, size, position
             FROM schema_def
             ORDER BY table_name, position, id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ColumnDefinition::new(
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let defs = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(defs)
    }

    fn snapshot_info(&self) -> Result<Option<SnapshotInfo>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT value FROM schema_meta WHERE key = ?1")?;
        let mut get = |key: &str| -> Result<Option<String>> {
            Ok(stmt
                .query_row(params![key], |row| row.get::<_, String>(0))
                .optional()?)
        };

        let loaded_at = match get(META_LOADED_AT)? {
            Some(value) => value,
            None => return Ok(None),
        };
        let loaded_at = DateTime::parse_from_rfc3339(&loaded_at)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|_| Error::SnapshotMeta {
                key: META_LOADED_AT.to_string(),
                value: loaded_at.clone(),
            })?;

        let source = get(META_SOURCE)?.map(PathBuf::from);
        let column_count = match get(META_COLUMN_COUNT)? {
            Some(count) => count.parse::<usize>().map_err(|_| Error::SnapshotMeta {
                key: META_COLUMN_COUNT.to_string(),
                value: count.clone(),
            })?,
            None => 0,
        };

        Ok(Some(SnapshotInfo {
            loaded_at,
            source,
            column_count,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("CUSTOMER", "ID", "0", "4", "1"),
            ColumnDefinition::new("CUSTOMER", "NAME", "1", "30", "2"),
            ColumnDefinition::new("ORDERS", "NO", "0", "8", "1"),
        ]
    }

    #[test]
    fn test_bulk_replace_and_lookup() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.bulk_replace(&sample(), None).unwrap(), 3);

        let attrs = store.lookup("CUSTOMER", "NAME").unwrap().unwrap();
        assert_eq!(attrs, ColumnAttributes::new("1", "30", "2"));

        assert!(store.lookup("CUSTOMER", "EMAIL").unwrap().is_none());
        assert!(store.lookup("customer", "ID").unwrap().is_none());
    }

    #[test]
    fn test_bulk_replace_clears_previous_contents() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.bulk_replace(&sample(), None).unwrap();

        let replacement = vec![ColumnDefinition::new("ITEM", "SKU", "0", "12", "1")];
        store.bulk_replace(&replacement, None).unwrap();

        assert_eq!(store.list_all().unwrap(), replacement);
        assert!(store.lookup("CUSTOMER", "ID").unwrap().is_none());
    }

    #[test]
    fn test_failed_bulk_replace_keeps_prior_state() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.bulk_replace(&sample(), None).unwrap();
        let before = store.list_all().unwrap();
        let info_before = store.snapshot_info().unwrap();

        // Duplicate key fails on the second insert, after the delete ran
        let bad = vec![
            ColumnDefinition::new("NEW", "A", "0", "1", "1"),
            ColumnDefinition::new("NEW", "A", "0", "2", "2"),
        ];
        let err = store.bulk_replace(&bad, None).unwrap_err();

        assert!(matches!(err, Error::StoreWrite { .. }));
        assert_eq!(store.list_all().unwrap(), before);
        assert_eq!(store.snapshot_info().unwrap(), info_before);
    }

    #[test]
    fn test_failed_reset_keeps_prior_state() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.bulk_replace(&sample(), None).unwrap();
        let before = store.list_all().unwrap();

        let bad = vec![
            ColumnDefinition::new("NEW", "A", "0", "1", "1"),
            ColumnDefinition::new("NEW", "A", "0", "1", "1"),
        ];
        assert!(matches!(
            store.reset(&bad, None),
            Err(Error::StoreWrite { .. })
        ));
        assert_eq!(store.list_all().unwrap(), before);
    }

    #[test]
    fn test_reset_rebuilds_store() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.bulk_replace(&sample(), None).unwrap();

        let fresh = vec![ColumnDefinition::new("ITEM", "SKU", "0", "12", "1")];
        assert_eq!(store.reset(&fresh, None).unwrap(), 1);
        assert_eq!(store.list_all().unwrap(), fresh);
    }

    #[test]
    fn test_list_all_orders_by_table_then_position_as_text() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let defs = vec![
            ColumnDefinition::new("B", "X", "0", "1", "1"),
            ColumnDefinition::new("A", "TEN", "0", "1", "10"),
            ColumnDefinition::new("A", "TWO", "0", "1", "2"),
            ColumnDefinition::new("A", "ONE", "0", "1", "1"),
        ];
        store.bulk_replace(&defs, None).unwrap();

        let columns: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|d| format!("{}.{}", d.table, d.column))
            .collect();
        // "10" sorts before "2" as text
        assert_eq!(columns, vec!["A.ONE", "A.TEN", "A.TWO", "B.X"]);
    }

    #[test]
    fn test_snapshot_info() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(store.snapshot_info().unwrap().is_none());

        store
            .bulk_replace(&sample(), Some(Path::new("ds.sch")))
            .unwrap();
        let info = store.snapshot_info().unwrap().unwrap();
        assert_eq!(info.column_count, 3);
        assert_eq!(info.source, Some(PathBuf::from("ds.sch")));

        store.bulk_replace(&sample()[..1], None).unwrap();
        let info = store.snapshot_info().unwrap().unwrap();
        assert_eq!(info.column_count, 1);
        assert_eq!(info.source, None);
    }

    #[test]
    fn test_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join(DEFAULT_DB_PATH);

        {
            let mut store = SqliteStore::open(&db_path).unwrap();
            store.bulk_replace(&sample(), None).unwrap();
        }

        let store = SqliteStore::open(&db_path).unwrap();
        assert_eq!(store.path(), db_path.as_path());
        assert_eq!(store.list_all().unwrap().len(), 3);
        assert!(store.lookup("ORDERS", "NO").unwrap().is_some());
    }

    #[test]
    fn test_open_existing_rejects_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("typo.db");

        let err = SqliteStore::open_existing(&db_path).err().unwrap();

        assert!(matches!(err, Error::StoreOpen { .. }));
        assert!(!db_path.exists());
    }

    #[test]
    fn test_open_existing_rejects_unloaded_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("other.db");
        Connection::open(&db_path)
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (x INTEGER);")
            .unwrap();

        let err = SqliteStore::open_existing(&db_path).err().unwrap();
        assert!(matches!(err, Error::StoreOpen { .. }));
    }

    #[test]
    fn test_open_existing_reads_loaded_store() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join(DEFAULT_DB_PATH);
        SqliteStore::open(&db_path)
            .unwrap()
            .bulk_replace(&sample(), None)
            .unwrap();

        let store = SqliteStore::open_existing(&db_path).unwrap();
        assert_eq!(store.list_all().unwrap().len(), 3);
    }

    #[test]
    fn test_unreadable_snapshot_metadata_is_an_error() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.bulk_replace(&sample(), None).unwrap();

        store
            .conn
            .execute(
                "UPDATE schema_meta SET value = 'many' WHERE key = ?1",
                params![META_COLUMN_COUNT],
            )
            .unwrap();
        let err = store.snapshot_info().unwrap_err();
        assert!(matches!(err, Error::SnapshotMeta { ref key, .. } if key == META_COLUMN_COUNT));

        store
            .conn
            .execute(
                "UPDATE schema_meta SET value = 'yesterday' WHERE key = ?1",
                params![META_LOADED_AT],
            )
            .unwrap();
        let err = store.snapshot_info().unwrap_err();
        assert!(matches!(err, Error::SnapshotMeta { ref key, .. } if key == META_LOADED_AT));
    }
}
