//! In-memory schema store, used in tests and for dry runs

use super::{SchemaStore, SnapshotInfo};
use crate::column::{ColumnAttributes, ColumnDefinition, ColumnKey};
use crate::error::{Error, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;

/// A schema store held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Definitions in insertion order
    entries: Vec<ColumnDefinition>,
    /// Key -> index into `entries`
    index: HashMap<ColumnKey, usize>,
    snapshot: Option<SnapshotInfo>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored definitions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no definitions
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SchemaStore for MemoryStore {
    fn bulk_replace(
        &mut self,
        records: &[ColumnDefinition],
        source: Option<&Path>,
    ) -> Result<usize> {
        // Build the replacement fully before touching current state
        let mut index = HashMap::with_capacity(records.len());
        for (i, def) in records.iter().enumerate() {
            let key = def.key();
            if index.contains_key(&key) {
                return Err(Error::StoreWrite {
                    reason: format!("duplicate column {}", key),
                    source: None,
                });
            }
            index.insert(key, i);
        }

        self.entries = records.to_vec();
        self.index = index;
        self.snapshot = Some(SnapshotInfo {
            loaded_at: Utc::now(),
            source: source.map(Path::to_path_buf),
            column_count: records.len(),
        });
        Ok(records.len())
    }

    fn lookup(&self, table: &str, column: &str) -> Result<Option<ColumnAttributes>> {
        let key = ColumnKey::new(table, column);
        Ok(self.index.get(&key).map(|&i| self.entries[i].attributes()))
    }

    fn list_all(&self) -> Result<Vec<ColumnDefinition>> {
        let mut defs = self.entries.clone();
        // Stable sort keeps insertion order for ties
        defs.sort_by(|a, b| (&a.table, &a.position).cmp(&(&b.table, &b.position)));
        Ok(defs)
    }

    fn snapshot_info(&self) -> Result<Option<SnapshotInfo>> {
        Ok(self.snapshot.clone())
    }
}
