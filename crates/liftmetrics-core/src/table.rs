//! In-memory tabular logs and CSV I/O.
//!
//! A [`Table`] keeps the header order of the source file and stores every
//! cell as text. Empty cells are kept as missing (`None`) so that the row
//! deduplicator can normalize them, while typed accessors coerce cells into
//! signal bits, floor numbers and timestamps on demand.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use compact_str::CompactString;
use indexmap::IndexMap;

use crate::error::LiftError;

/// A single cell. `None` means the field was empty in the source.
pub type Cell = Option<CompactString>;

/// One sample row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Cells in header order.
    pub cells: Vec<Cell>,
    /// 1-based line number in the source file (header is line 1).
    pub line: u64,
}

impl Row {
    /// Create a row from cells.
    pub fn new(cells: Vec<Cell>, line: u64) -> Self {
        Self { cells, line }
    }

    /// Cell text, if present and non-empty.
    pub fn get(&self, column: usize) -> Option<&str> {
        self.cells.get(column).and_then(|c| c.as_deref())
    }
}

/// Tabular log file: ordered headers plus rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    source: PathBuf,
    headers: Vec<CompactString>,
    index: IndexMap<CompactString, usize>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given headers.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        let headers: Vec<CompactString> = headers.into_iter().map(Into::into).collect();
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();
        Self {
            source: PathBuf::new(),
            headers,
            index,
            rows: Vec::new(),
        }
    }

    /// Attach the path used in error messages.
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = source.into();
        self
    }

    /// Append a row of string values. Empty strings become missing cells.
    pub fn push<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cells = values.into_iter().map(|v| to_cell(v.as_ref())).collect();
        let line = self.rows.last().map(|r| r.line + 1).unwrap_or(2);
        self.rows.push(Row::new(cells, line));
    }

    /// Read a CSV file with a header row.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LiftError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| LiftError::FileUnreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        let len = file.metadata().map_err(|e| LiftError::io(path, e))?.len();
        if len == 0 {
            return Err(LiftError::EmptyFile {
                path: path.to_path_buf(),
            });
        }
        Self::from_reader(file, path)
    }

    /// Read CSV from any reader; `source` is only used for error context.
    pub fn from_reader<R: Read>(reader: R, source: impl Into<PathBuf>) -> Result<Self, LiftError> {
        let source = source.into();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| csv_error(&source, e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(LiftError::EmptyFile { path: source });
        }

        let mut table = Table::new(headers).with_source(&source);
        for record in reader.records() {
            let record = record.map_err(|e| csv_error(&source, e))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let cells = record.iter().map(to_cell).collect();
            table.rows.push(Row::new(cells, line));
        }
        Ok(table)
    }

    /// Write the table as CSV, missing cells as empty fields.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), LiftError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer
            .write_record(self.headers.iter().map(|h| h.as_str()))
            .map_err(|e| csv_error(&self.source, e))?;
        for row in &self.rows {
            writer
                .write_record(row.cells.iter().map(|c| c.as_deref().unwrap_or("")))
                .map_err(|e| csv_error(&self.source, e))?;
        }
        writer.flush().map_err(|e| LiftError::io(&self.source, e))
    }

    /// Write the table to `path`, creating parent directories.
    pub fn write_path(&self, path: impl AsRef<Path>) -> Result<(), LiftError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LiftError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| LiftError::io(path, e))?;
        self.to_writer(std::io::BufWriter::new(file))
    }

    /// Path the table was read from (empty for in-memory tables).
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Column names in file order.
    pub fn headers(&self) -> &[CompactString] {
        &self.headers
    }

    /// All rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column, if present.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Index of a column that an analyzer cannot work without.
    pub fn require_column(&self, name: &str) -> Result<usize, LiftError> {
        self.column(name)
            .ok_or_else(|| LiftError::MissingRequiredColumn {
                path: self.source.clone(),
                column: name.to_string(),
            })
    }

    /// Replace the rows, keeping headers and source.
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    /// Coerce a cell to a signal bit. Missing cells read as 0.
    pub fn bit(&self, row: &Row, column: usize) -> Result<u8, LiftError> {
        match row.get(column) {
            None => Ok(0),
            Some(text) => parse_bit(text).ok_or_else(|| self.malformed(row, column, text)),
        }
    }

    /// Coerce a cell to a floor number.
    pub fn floor(&self, row: &Row, column: usize) -> Result<i64, LiftError> {
        let text = row.get(column).unwrap_or("");
        parse_floor(text).ok_or_else(|| self.malformed(row, column, text))
    }

    /// Coerce a cell to a timestamp; `None` when missing or unparsable.
    pub fn timestamp(&self, row: &Row, column: usize) -> Option<NaiveDateTime> {
        row.get(column).and_then(parse_timestamp)
    }

    fn malformed(&self, row: &Row, column: usize, text: &str) -> LiftError {
        let name = self.headers.get(column).map(|h| h.as_str()).unwrap_or("?");
        LiftError::MalformedRow {
            path: self.source.clone(),
            line: row.line,
            message: format!("column '{name}' has unexpected value '{text}'"),
        }
    }
}

fn to_cell(value: &str) -> Cell {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(CompactString::new(value))
    }
}

fn csv_error(path: &Path, err: csv::Error) -> LiftError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    match err.into_kind() {
        csv::ErrorKind::Io(source) => LiftError::io(path, source),
        kind => LiftError::MalformedRow {
            path: path.to_path_buf(),
            line,
            message: format!("{kind:?}"),
        },
    }
}

/// Parse a binary signal: numbers map to 1 when non-zero, booleans by name.
pub fn parse_bit(text: &str) -> Option<u8> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        return Some(1);
    }
    if text.eq_ignore_ascii_case("false") {
        return Some(0);
    }
    let value: f64 = text.parse().ok()?;
    if value.is_nan() {
        return None;
    }
    Some(u8::from(value != 0.0))
}

/// Parse a floor indicator; floats are truncated toward zero.
pub fn parse_floor(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }
    let value: f64 = text.parse().ok()?;
    value.is_finite().then(|| value.trunc() as i64)
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

/// Parse a sample timestamp. Offsets are dropped, keeping the wall-clock time.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bit() {
        assert_eq!(parse_bit("1"), Some(1));
        assert_eq!(parse_bit("1.0"), Some(1));
        assert_eq!(parse_bit("0"), Some(0));
        assert_eq!(parse_bit(" 0.0 "), Some(0));
        assert_eq!(parse_bit("True"), Some(1));
        assert_eq!(parse_bit("open"), None);
    }

    #[test]
    fn test_parse_floor() {
        assert_eq!(parse_floor("7"), Some(7));
        assert_eq!(parse_floor("-2"), Some(-2));
        assert_eq!(parse_floor("3.0"), Some(3));
        assert_eq!(parse_floor(""), None);
        assert_eq!(parse_floor("lobby"), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-03-01 08:15:00").is_some());
        assert!(parse_timestamp("2024-03-01T08:15:00.250").is_some());
        assert!(parse_timestamp("2024-03-01T08:15:00+08:00").is_some());
        assert!(parse_timestamp("2024-03-01").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_parse_timestamp_keeps_local_date() {
        let parsed = parse_timestamp("2024-03-01T02:15:00+08:00").unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(parsed.format("%H:%M").to_string(), "02:15");
    }

    #[test]
    fn test_read_csv_keeps_missing_cells() {
        let data = "id,_mb1s,_lfls\n1,1,3\n2,,4\n";
        let table = Table::from_reader(data.as_bytes(), "mem.csv").unwrap();

        assert_eq!(table.headers(), &["id", "_mb1s", "_lfls"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].cells[1], None);
        assert_eq!(table.column("_lfls"), Some(2));
        assert_eq!(table.rows()[1].line, 3);
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let data = "a,b\n1,2\n3\n";
        let err = Table::from_reader(data.as_bytes(), "mem.csv").unwrap_err();
        assert!(matches!(err, LiftError::MalformedRow { .. }));
    }

    #[test]
    fn test_typed_accessors() {
        let mut table = Table::new(["_mb1s", "_lfls"]).with_source("t.csv");
        table.push(["1", "5"]);
        table.push(["x", ""]);

        let rows = table.rows().to_vec();
        assert_eq!(table.bit(&rows[0], 0).unwrap(), 1);
        assert_eq!(table.floor(&rows[0], 1).unwrap(), 5);
        assert!(matches!(
            table.bit(&rows[1], 0),
            Err(LiftError::MalformedRow { line: 3, .. })
        ));
        assert!(table.floor(&rows[1], 1).is_err());
    }

    #[test]
    fn test_require_column() {
        let table = Table::new(["_mb1s"]).with_source("t.csv");
        let err = table.require_column("_lds").unwrap_err();
        assert!(matches!(err, LiftError::MissingRequiredColumn { .. }));
    }

    #[test]
    fn test_write_round_trip_preserves_order() {
        let mut table = Table::new(["b", "a"]);
        table.push(["2", ""]);

        let mut out = Vec::new();
        table.to_writer(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "b,a\n2,\n");
    }
}
