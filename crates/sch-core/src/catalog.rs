//! Per-table view of a set of column definitions

use crate::column::ColumnDefinition;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A column within a catalog table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub column: String,
    #[serde(rename = "type")]
    pub type_id: String,
    pub size: String,
    pub position: String,
}

/// Column definitions grouped by table.
///
/// Tables are kept sorted by name; columns keep the order they were added in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaCatalog {
    tables: BTreeMap<String, Vec<ColumnEntry>>,
}

impl SchemaCatalog {
    /// Group definitions by table
    pub fn from_definitions<'a, I>(defs: I) -> Self
    where
        I: IntoIterator<Item = &'a ColumnDefinition>,
    {
        let mut tables: BTreeMap<String, Vec<ColumnEntry>> = BTreeMap::new();
        for def in defs {
            tables.entry(def.table.clone()).or_default().push(ColumnEntry {
                column: def.column.clone(),
                type_id: def.type_id.clone(),
                size: def.size.clone(),
                position: def.position.clone(),
            });
        }
        Self { tables }
    }

    /// Columns of one table
    pub fn table(&self, name: &str) -> Option<&[ColumnEntry]> {
        self.tables.get(name).map(Vec::as_slice)
    }

    /// Sorted table names
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Number of tables
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Total number of columns across all tables
    pub fn column_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Render one table in fixed-width columns
    pub fn render_table(&self, name: &str) -> Option<String> {
        let columns = self.tables.get(name)?;

        let mut out = String::new();
        let _ = writeln!(out, "Table: {}", name);
        let _ = writeln!(out, "{}", "-".repeat(80));
        let _ = writeln!(out, "{:<30} {:<10} {:<10} {}", "Column", "Type", "Size", "Position");
        let _ = writeln!(out, "{}", "-".repeat(80));
        for c in columns {
            let _ = writeln!(
                out,
                "{:<30} {:<10} {:<10} {}",
                c.column, c.type_id, c.size, c.position
            );
        }
        Some(out)
    }

    /// Render every table, separated by blank lines
    pub fn render_all(&self) -> String {
        self.tables
            .keys()
            .filter_map(|name| self.render_table(name))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Serialize as `{table: [{column, type, size, position}]}`
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the catalog as JSON or CSV
    pub fn export<P: AsRef<Path>>(&self, path: P, format: &str) -> Result<()> {
        let path = path.as_ref();
        match format.to_lowercase().as_str() {
            "json" => {
                let mut writer = BufWriter::new(File::create(path)?);
                writeln!(writer, "{}", self.to_json()?)?;
                writer.flush()?;
            }
            "csv" => self.write_csv(File::create(path)?)?,
            other => return Err(Error::UnknownFormat(other.to_string())),
        }
        log::debug!("exported {} column(s) to {}", self.column_count(), path.display());
        Ok(())
    }

    /// Write the catalog as `table,column,type,size,position` rows
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["table", "column", "type", "size", "position"])?;
        for (table, columns) in &self.tables {
            for c in columns {
                csv_writer.write_record([
                    table.as_str(),
                    c.column.as_str(),
                    c.type_id.as_str(),
                    c.size.as_str(),
                    c.position.as_str(),
                ])?;
            }
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SchemaCatalog {
        let defs = vec![
            ColumnDefinition::new("ORDERS", "NO", "0", "8", "1"),
            ColumnDefinition::new("CUSTOMER", "ID", "0", "4", "1"),
            ColumnDefinition::new("CUSTOMER", "NAME", "1", "30", "2"),
        ];
        SchemaCatalog::from_definitions(&defs)
    }

    #[test]
    fn test_grouping() {
        let catalog = catalog();

        assert_eq!(catalog.table_names(), vec!["CUSTOMER", "ORDERS"]);
        assert_eq!(catalog.table_count(), 2);
        assert_eq!(catalog.column_count(), 3);
        assert_eq!(catalog.table("CUSTOMER").unwrap()[1].column, "NAME");
        assert!(catalog.table("MISSING").is_none());
    }

    #[test]
    fn test_render_table() {
        let text = catalog().render_table("CUSTOMER").unwrap();

        assert!(text.starts_with("Table: CUSTOMER\n"));
        assert!(text.contains(&format!("{:<30} {:<10} {:<10} {}", "NAME", "1", "30", "2")));
        assert!(catalog().render_table("NOPE").is_none());
    }

    #[test]
    fn test_json_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&catalog().to_json().unwrap()).unwrap();

        assert_eq!(json["CUSTOMER"][0]["column"], "ID");
        assert_eq!(json["CUSTOMER"][0]["type"], "0");
        assert_eq!(json["ORDERS"][0]["size"], "8");
    }

    #[test]
    fn test_write_csv() {
        let mut buf = Vec::new();
        catalog().write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "table,column,type,size,position");
        assert_eq!(lines[1], "CUSTOMER,ID,0,4,1");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_export_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let err = catalog()
            .export(dir.path().join("out.xml"), "xml")
            .unwrap_err();
        assert!(matches!(err, Error::UnknownFormat(_)));
    }
}
