//! Reading and writing of tab-separated sample tables.
//!
//! Lines starting with `#` are comments. Empty fields are kept as empty
//! strings, so optional values survive a read/write cycle unchanged; only
//! fields missing at the end of a short line become null.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, warn};

use crate::error::ZarpError;
use crate::fs_util;
use crate::schema::ColumnMapping;
use crate::table::Table;
use crate::value::Value;

/// Lines starting with this byte are comments; written fields containing it
/// are quoted.
const COMMENT: u8 = b'#';

/// Reads a sample table from `path`.
///
/// `columns` selects a subset of the file's columns (in file order) and is
/// applied before `mapping` renames them.
pub fn read(
    path: &Utf8Path,
    mapping: Option<&ColumnMapping>,
    columns: Option<&[&str]>,
) -> Result<Table, ZarpError> {
    debug!(%path, "reading sample table");
    let content = fs::read_to_string(path.as_std_path()).map_err(|err| ZarpError::TableRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let table = parse(&content, mapping, columns)?;
    debug!(records = table.len(), "records read");
    Ok(table)
}

pub fn parse(
    content: &str,
    mapping: Option<&ColumnMapping>,
    columns: Option<&[&str]>,
) -> Result<Table, ZarpError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(COMMENT))
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|err| ZarpError::TableParse(err.to_string()))?;
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        let Some(names) = &header else {
            header = Some(record.iter().map(str::to_string).collect());
            continue;
        };
        if record.len() > names.len() {
            return Err(ZarpError::TableParse(format!(
                "record {} has {} fields, header has {}",
                line + 1,
                record.len(),
                names.len()
            )));
        }
        let mut row = record.iter().map(Value::from).collect::<Vec<_>>();
        row.resize(names.len(), Value::Null);
        rows.push(row);
    }

    let Some(names) = header else {
        return Ok(Table::default());
    };
    let mut table = Table::from_rows(names, rows)?;
    if let Some(columns) = columns {
        for column in columns {
            if !table.has_column(column) {
                return Err(ZarpError::MissingColumn(column.to_string()));
            }
        }
        let ordered = table
            .columns()
            .iter()
            .filter(|name| columns.contains(&name.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        let ordered = ordered.iter().map(String::as_str).collect::<Vec<_>>();
        table = table.select(&ordered)?;
    }
    if let Some(mapping) = mapping {
        table.rename(mapping);
    }
    Ok(table)
}

/// Writes `table` to `path`, replacing any existing file.
///
/// `mapping` renames columns first; `columns` then selects and orders the
/// output. Selected columns missing from the table are written empty.
pub fn write(
    table: &Table,
    path: &Utf8Path,
    mapping: Option<&ColumnMapping>,
    columns: Option<&[&str]>,
) -> Result<(), ZarpError> {
    debug!(%path, "writing sample table");
    let content = render(table, mapping, columns).map_err(|err| ZarpError::TableWrite {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    fs_util::write_atomic(path, &content).map_err(|err| ZarpError::TableWrite {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    debug!(records = table.len(), "records written");
    Ok(())
}

pub fn render(
    table: &Table,
    mapping: Option<&ColumnMapping>,
    columns: Option<&[&str]>,
) -> Result<Vec<u8>, ZarpError> {
    let mut table = table.clone();
    if let Some(mapping) = mapping {
        table.rename(mapping);
    }
    if let Some(columns) = columns {
        let missing = columns
            .iter()
            .filter(|column| !table.has_column(column))
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            warn!(
                ?missing,
                "missing columns in sample table will be added and filled with empty strings"
            );
        }
        table = table.select_or_fill(columns, &Value::from(""));
    }

    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .comment(Some(COMMENT))
        .from_writer(Vec::new());
    writer
        .write_record(table.columns())
        .map_err(|err| ZarpError::TableParse(err.to_string()))?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(Value::render))
            .map_err(|err| ZarpError::TableParse(err.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| ZarpError::TableParse(err.to_string()))
}

/// Directory against which relative paths inside the table at `path` resolve.
pub fn anchor_of(path: &Utf8Path) -> Utf8PathBuf {
    let absolute = fs_util::absolute(path);
    absolute
        .parent()
        .map(Utf8Path::to_path_buf)
        .unwrap_or(absolute)
}
