//! Reconciliation of schema file columns against a schema store

use crate::column::ColumnDefinition;
use crate::error::{Error, Result};
use crate::parser::{open_schema, SchemaLines};
use crate::report::{DiffReport, DifferenceRecord};
use crate::store::SchemaStore;
use std::io::BufRead;
use std::path::Path;

/// Compare one file column against the store.
///
/// Returns `None` when type, size and position all match exactly.
pub fn reconcile_one<S: SchemaStore + ?Sized>(
    store: &S,
    def: &ColumnDefinition,
) -> Result<Option<DifferenceRecord>> {
    let file_info = def.attributes();

    let record = match store.lookup(&def.table, &def.column)? {
        None => Some(DifferenceRecord::missing(&def.table, &def.column, file_info)),
        Some(db_info) if db_info != file_info => Some(DifferenceRecord::different(
            &def.table,
            &def.column,
            file_info,
            db_info,
        )),
        Some(_) => None,
    };
    Ok(record)
}

/// Reconcile definitions in order.
///
/// Repeated (table, column) keys are compared independently.
pub fn reconcile<S, I>(store: &S, defs: I) -> Result<DiffReport>
where
    S: SchemaStore + ?Sized,
    I: IntoIterator<Item = ColumnDefinition>,
{
    let mut report = DiffReport::default();
    for def in defs {
        report.checked += 1;
        if let Some(record) = reconcile_one(store, &def)? {
            report.records.push(record);
        }
    }
    Ok(report)
}

/// Reconcile a schema stream line by line
pub fn reconcile_reader<S, R>(store: &S, reader: R) -> Result<DiffReport>
where
    S: SchemaStore + ?Sized,
    R: BufRead,
{
    reconcile_lines(store, SchemaLines::new(reader), Path::new("<reader>"))
}

/// Reconcile a schema file against the store
pub fn reconcile_file<S, P>(store: &S, path: P) -> Result<DiffReport>
where
    S: SchemaStore + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let lines = open_schema(path)?;
    let report = reconcile_lines(store, lines, path)?;
    log::info!(
        "checked {} column(s) from {}: {} missing, {} different",
        report.checked,
        path.display(),
        report.missing_count(),
        report.different_count()
    );
    Ok(report)
}

fn reconcile_lines<S, R>(store: &S, mut lines: SchemaLines<R>, path: &Path) -> Result<DiffReport>
where
    S: SchemaStore + ?Sized,
    R: BufRead,
{
    let mut report = DiffReport::default();
    for def in lines.by_ref() {
        let def = def.map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        report.checked += 1;
        if let Some(record) = reconcile_one(store, &def)? {
            report.records.push(record);
        }
    }

    if lines.skipped() > 0 {
        log::debug!("skipped {} malformed line(s)", lines.skipped());
    }
    Ok(report)
}
