//! Schema store: the persisted snapshot that schema files are checked against

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, DEFAULT_DB_PATH};

use crate::column::{ColumnAttributes, ColumnDefinition};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata about the last successful bulk load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// When the load committed
    pub loaded_at: DateTime<Utc>,
    /// Schema file the snapshot was loaded from, if known
    pub source: Option<PathBuf>,
    /// Number of column definitions loaded
    pub column_count: usize,
}

/// Storage interface used by the reconciler and the CLI.
///
/// Entries are unique on (table, column).
pub trait SchemaStore {
    /// Replace the whole store with `records`.
    ///
    /// Either every record is stored or nothing changes. A failed load returns
    /// [`crate::Error::StoreWrite`] and leaves the previous contents in place.
    fn bulk_replace(
        &mut self,
        records: &[ColumnDefinition],
        source: Option<&Path>,
    ) -> Result<usize>;

    /// Point lookup by exact (table, column) match
    fn lookup(&self, table: &str, column: &str) -> Result<Option<ColumnAttributes>>;

    /// Every stored definition, ordered by (table, position) as strings
    fn list_all(&self) -> Result<Vec<ColumnDefinition>>;

    /// Metadata of the last successful load, if any
    fn snapshot_info(&self) -> Result<Option<SnapshotInfo>>;
}
