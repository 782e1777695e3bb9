//! sch-core: Core library for reconciling schema files against a schema store
//!
//! This library provides functionality to:
//! - Parse `^`-delimited schema files into column definitions
//! - Persist a schema snapshot in SQLite (or keep one in memory)
//! - Reconcile a schema file against the stored snapshot
//! - Render and export the resulting differences, and filter exported reports

pub mod catalog;
pub mod column;
pub mod error;
pub mod parser;
pub mod reconciler;
pub mod report;
pub mod store;

pub use catalog::{ColumnEntry, SchemaCatalog};
pub use column::{ColumnAttributes, ColumnDefinition, ColumnKey};
pub use error::{Error, Result};
pub use parser::{parse_line, parse_schema_file, parse_schema_str, ParsedSchema, SchemaLines};
pub use reconciler::{reconcile, reconcile_file, reconcile_one, reconcile_reader};
pub use report::{DiffReport, DiffStatus, DifferenceRecord, DEFAULT_FILTER_SIZE};
pub use store::{MemoryStore, SchemaStore, SnapshotInfo, SqliteStore, DEFAULT_DB_PATH};
