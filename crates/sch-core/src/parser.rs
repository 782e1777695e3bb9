//! Parser for `^`-delimited schema files
//!
//! Each line has the form `table^column^type^size^position^`. The trailing
//! sixth field is a terminator and is discarded. Lines with any other field
//! count are skipped without error.

use crate::column::ColumnDefinition;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Field delimiter used by schema files
pub const DELIMITER: char = '^';

/// Number of fields in a valid line, including the trailing terminator field
const FIELD_COUNT: usize = 6;

/// Parse a single schema line.
///
/// Returns `None` for blank or malformed lines.
pub fn parse_line(line: &str) -> Option<ColumnDefinition> {
    let parts: Vec<&str> = line.trim().split(DELIMITER).collect();
    if parts.len() != FIELD_COUNT {
        return None;
    }

    Some(ColumnDefinition::new(
        parts[0], parts[1], parts[2], parts[3], parts[4],
    ))
}

/// Iterator over the column definitions of a schema file, in file order.
///
/// Malformed lines are skipped. Read errors are yielded as they occur.
pub struct SchemaLines<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
    skipped: usize,
}

impl<R: BufRead> SchemaLines<R> {
    /// Wrap a buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Number of lines read so far
    pub fn lines_read(&self) -> usize {
        self.line_no
    }

    /// Number of non-blank lines skipped as malformed so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for SchemaLines<R> {
    type Item = std::io::Result<ColumnDefinition>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            self.line_no += 1;

            match parse_line(&line) {
                Some(def) => return Some(Ok(def)),
                None => {
                    if !line.trim().is_empty() {
                        self.skipped += 1;
                        log::trace!("skipping malformed line {}: {:?}", self.line_no, line);
                    }
                }
            }
        }
    }
}

/// A fully parsed schema file
#[derive(Debug, Clone)]
pub struct ParsedSchema {
    /// Definitions in file order
    pub definitions: Vec<ColumnDefinition>,
    /// Total number of lines read
    pub total_lines: usize,
    /// Non-blank lines that were skipped
    pub skipped_lines: usize,
    /// Source file path
    pub source_path: PathBuf,
}

/// Open a schema file for line-by-line parsing
pub fn open_schema<P: AsRef<Path>>(path: P) -> Result<SchemaLines<BufReader<File>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(SchemaLines::new(BufReader::new(file)))
}

/// Parse a whole schema file
pub fn parse_schema_file<P: AsRef<Path>>(path: P) -> Result<ParsedSchema> {
    let path = path.as_ref();
    let mut lines = open_schema(path)?;

    let mut definitions = Vec::new();
    for def in lines.by_ref() {
        let def = def.map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        definitions.push(def);
    }

    if lines.skipped() > 0 {
        log::debug!(
            "skipped {} malformed line(s) in {}",
            lines.skipped(),
            path.display()
        );
    }

    Ok(ParsedSchema {
        definitions,
        total_lines: lines.lines_read(),
        skipped_lines: lines.skipped(),
        source_path: path.to_path_buf(),
    })
}

/// Parse schema content from a string (useful for testing)
pub fn parse_schema_str(content: &str) -> Vec<ColumnDefinition> {
    content.lines().filter_map(parse_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_valid_line() {
        let def = parse_line("CUSTOMER^ID^0^4^1^").unwrap();

        assert_eq!(def.table, "CUSTOMER");
        assert_eq!(def.column, "ID");
        assert_eq!(def.type_id, "0");
        assert_eq!(def.size, "4");
        assert_eq!(def.position, "1");
    }

    #[test]
    fn test_trailing_content_is_discarded() {
        let def = parse_line("CUSTOMER^ID^0^4^1^ignored").unwrap();
        assert_eq!(def.position, "1");
    }

    #[test]
    fn test_line_edges_are_trimmed() {
        let def = parse_line("  CUSTOMER^ID^0^4^1^  \r").unwrap();
        assert_eq!(def.table, "CUSTOMER");
    }

    #[test]
    fn test_wrong_field_count_yields_nothing() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   ").is_none());
        assert!(parse_line("CUSTOMER^ID^0^4^1").is_none());
        assert!(parse_line("CUSTOMER^ID^0^4^1^^").is_none());
        assert!(parse_line("just some text").is_none());
    }

    #[test]
    fn test_fields_are_kept_verbatim() {
        let def = parse_line("T^ C ^0^010^ 2^").unwrap();
        assert_eq!(def.column, " C ");
        assert_eq!(def.size, "010");
        assert_eq!(def.position, " 2");
    }

    #[test]
    fn test_parse_schema_str_skips_malformed() {
        let content = "CUSTOMER^ID^0^4^1^\n\ngarbage\nCUSTOMER^NAME^1^30^2^\n";
        let defs = parse_schema_str(content);

        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].column, "ID");
        assert_eq!(defs[1].column, "NAME");
    }

    #[test]
    fn test_schema_lines_counts_skipped() {
        let content = "A^X^0^1^1^\nbad^line\n\nA^Y^0^1^2^\n";
        let mut lines = SchemaLines::new(content.as_bytes());
        let defs: Vec<_> = lines.by_ref().collect::<std::io::Result<_>>().unwrap();

        assert_eq!(defs.len(), 2);
        assert_eq!(lines.lines_read(), 4);
        assert_eq!(lines.skipped(), 1);
    }

    #[test]
    fn test_parse_schema_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "CUSTOMER^ID^0^4^1^").unwrap();
        writeln!(file, "CUSTOMER^NAME^1^30^2^").unwrap();
        writeln!(file, "broken").unwrap();

        let parsed = parse_schema_file(file.path()).unwrap();

        assert_eq!(parsed.definitions.len(), 2);
        assert_eq!(parsed.total_lines, 3);
        assert_eq!(parsed.skipped_lines, 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_schema_file(dir.path().join("nope.sch")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
