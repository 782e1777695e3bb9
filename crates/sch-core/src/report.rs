//! Difference records and their text/JSON renderings
//!
//! A report is exported as a single JSON array:
//!
//! ```text
//! [
//!   {
//!     "status": "different",
//!     "table": "CUSTOMER",
//!     "column": "ID",
//!     "file_info": {"type": "0", "size": "4", "position": "1"},
//!     "db_info": {"type": "0", "size": "8", "position": "1"}
//!   }
//! ]
//! ```

use crate::column::ColumnAttributes;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Size filter used when none is given
pub const DEFAULT_FILTER_SIZE: &str = "3594";

const NO_DIFFERENCES: &str = "No differences found";

/// Outcome of comparing one file column against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffStatus {
    /// The column is declared in the file but not stored
    #[serde(rename = "missing_in_db")]
    MissingInStore,
    /// The column is stored with at least one different attribute
    #[serde(rename = "different")]
    Different,
}

impl DiffStatus {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            DiffStatus::MissingInStore => "Missing in database",
            DiffStatus::Different => "Different values",
        }
    }
}

/// One reported discrepancy between the schema file and the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferenceRecord {
    pub status: DiffStatus,
    pub table: String,
    pub column: String,
    /// Attributes declared in the schema file
    pub file_info: ColumnAttributes,
    /// Attributes held by the store; `None` exactly when the column is missing
    pub db_info: Option<ColumnAttributes>,
}

impl DifferenceRecord {
    /// A file column with no stored counterpart
    pub fn missing(
        table: impl Into<String>,
        column: impl Into<String>,
        file_info: ColumnAttributes,
    ) -> Self {
        Self {
            status: DiffStatus::MissingInStore,
            table: table.into(),
            column: column.into(),
            file_info,
            db_info: None,
        }
    }

    /// A file column whose stored attributes differ
    pub fn different(
        table: impl Into<String>,
        column: impl Into<String>,
        file_info: ColumnAttributes,
        db_info: ColumnAttributes,
    ) -> Self {
        Self {
            status: DiffStatus::Different,
            table: table.into(),
            column: column.into(),
            file_info,
            db_info: Some(db_info),
        }
    }

    /// Whether `db_info` is present exactly when the status needs it
    pub fn is_consistent(&self) -> bool {
        match self.status {
            DiffStatus::MissingInStore => self.db_info.is_none(),
            DiffStatus::Different => self.db_info.is_some(),
        }
    }
}

/// The ordered differences produced by one reconciliation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffReport {
    /// Differences in file order
    pub records: Vec<DifferenceRecord>,
    /// Number of file columns that were compared
    pub checked: usize,
}

impl DiffReport {
    /// Create a report from already classified records
    pub fn new(records: Vec<DifferenceRecord>, checked: usize) -> Self {
        Self { records, checked }
    }

    /// Returns true if no differences were found
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of columns missing from the store
    pub fn missing_count(&self) -> usize {
        self.count(DiffStatus::MissingInStore)
    }

    /// Number of columns with different attributes
    pub fn different_count(&self) -> usize {
        self.count(DiffStatus::Different)
    }

    fn count(&self, status: DiffStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// Serialize the records as a pretty-printed JSON array
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    /// Write the JSON export to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_json()?;
        fs::write(path.as_ref(), content)?;
        log::debug!(
            "exported {} difference(s) to {}",
            self.records.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Load a previously exported report.
    ///
    /// Records with a `missing_in_db` status must carry a null `db_info`, and
    /// `different` records must carry one.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let records: Vec<DifferenceRecord> = serde_json::from_str(&content)?;

        if let Some(index) = records.iter().position(|r| !r.is_consistent()) {
            let reason = match records[index].status {
                DiffStatus::MissingInStore => "missing_in_db record has db_info",
                DiffStatus::Different => "different record has no db_info",
            };
            return Err(Error::InvalidReport {
                index,
                reason: reason.to_string(),
            });
        }

        let checked = records.len();
        Ok(Self { records, checked })
    }

    /// Keep only the records whose file size differs from `expected`.
    ///
    /// Order is preserved. The store is not consulted.
    pub fn filter_file_size_ne(&self, expected: &str) -> DiffReport {
        let records: Vec<DifferenceRecord> = self
            .records
            .iter()
            .filter(|r| r.file_info.size != expected)
            .cloned()
            .collect();
        DiffReport {
            checked: self.records.len(),
            records,
        }
    }

    /// Render the report as text, grouped by table in order of first appearance
    pub fn render_text(&self) -> String {
        if self.records.is_empty() {
            return format!("{}\n", NO_DIFFERENCES);
        }

        let mut tables: Vec<&str> = Vec::new();
        for record in &self.records {
            if !tables.contains(&record.table.as_str()) {
                tables.push(&record.table);
            }
        }

        let mut out = String::new();
        for table in tables {
            let _ = writeln!(out, "\nTable: {}", table);
            let _ = writeln!(out, "{}", "-".repeat(80));

            for record in self.records.iter().filter(|r| r.table == table) {
                let _ = writeln!(out, "Column: {}", record.column);
                let _ = writeln!(out, "Status: {}", record.status.label());
                let _ = writeln!(out, "File values: {}", record.file_info);
                if let Some(db) = &record.db_info {
                    let _ = writeln!(out, "DB values:   {}", db);
                }
                let _ = writeln!(out, "{}", "-".repeat(40));
            }
        }

        let _ = writeln!(
            out,
            "\n{} difference(s): {} missing, {} different",
            self.records.len(),
            self.missing_count(),
            self.different_count()
        );
        out
    }

    /// Render a size-focused listing, as used for filtered reports
    pub fn render_sizes(&self) -> String {
        if self.records.is_empty() {
            return "No records found with different size\n".to_string();
        }

        let mut out = String::new();
        let _ = writeln!(out, "Found {} records with different size:", self.records.len());
        let _ = writeln!(out, "{}", "-".repeat(80));
        for record in &self.records {
            let _ = writeln!(out, "Table: {}", record.table);
            let _ = writeln!(out, "Column: {}", record.column);
            let _ = writeln!(out, "Size in file: {}", record.file_info.size);
            if let Some(db) = &record.db_info {
                let _ = writeln!(out, "Size in DB: {}", db.size);
            }
            let _ = writeln!(out, "{}", "-".repeat(40));
        }
        out
    }
}
