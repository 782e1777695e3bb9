//! Core column types shared by the parser, the store and the reconciler

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a column: (table, column)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnKey {
    pub table: String,
    pub column: String,
}

impl ColumnKey {
    /// Create a new key
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.table, self.column)
    }
}

/// The compared attributes of a column.
///
/// All values are opaque strings. `"10"` and `"010"` are different sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAttributes {
    /// Type identifier as written in the schema file
    #[serde(rename = "type")]
    pub type_id: String,
    /// Declared size
    pub size: String,
    /// Ordinal position within the table
    pub position: String,
}

impl ColumnAttributes {
    /// Create a new attribute set
    pub fn new(
        type_id: impl Into<String>,
        size: impl Into<String>,
        position: impl Into<String>,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            size: size.into(),
            position: position.into(),
        }
    }
}

impl fmt::Display for ColumnAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type={} size={} position={}",
            self.type_id, self.size, self.position
        )
    }
}

/// One column definition, either declared in a schema file or held in a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub table: String,
    pub column: String,
    pub type_id: String,
    pub size: String,
    pub position: String,
}

impl ColumnDefinition {
    /// Create a new column definition
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        type_id: impl Into<String>,
        size: impl Into<String>,
        position: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            type_id: type_id.into(),
            size: size.into(),
            position: position.into(),
        }
    }

    /// The (table, column) identity of this definition
    pub fn key(&self) -> ColumnKey {
        ColumnKey::new(self.table.clone(), self.column.clone())
    }

    /// The attributes compared during reconciliation
    pub fn attributes(&self) -> ColumnAttributes {
        ColumnAttributes::new(
            self.type_id.clone(),
            self.size.clone(),
            self.position.clone(),
        )
    }
}
