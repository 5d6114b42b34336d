use std::collections::{HashMap, HashSet};
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{Level, debug, trace, warn};

use crate::domain::ReferenceKind;
use crate::error::ZarpError;
use crate::fs_util;
use crate::sample::{Sample, samples_to_table};
use crate::schema::Schema;
use crate::table::Table;
use crate::value::Value;

/// Digest over a record's (column, value) pairs, independent of column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    pub fn of<'a>(names: impl IntoIterator<Item = &'a str>, values: &[Value]) -> Self {
        let mut cells = names.into_iter().zip(values).collect::<Vec<_>>();
        cells.sort_by(|left, right| left.0.cmp(right.0));
        let mut context = md5::Context::new();
        for (name, value) in cells {
            context.consume(name.as_bytes());
            context.consume(b"\x1f");
            if value.is_null() {
                context.consume(b"\x00");
            } else {
                context.consume(b"\x01");
                context.consume(value.render().as_bytes());
            }
            context.consume(b"\x1e");
        }
        Self(context.compute().0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Which columns hold relative paths and what they are relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolution {
    anchor: Utf8PathBuf,
    columns: Vec<String>,
}

impl PathResolution {
    pub fn new(anchor: impl Into<Utf8PathBuf>, columns: Vec<String>) -> Self {
        Self {
            anchor: anchor.into(),
            columns,
        }
    }

    /// Resolves the schema's path columns against `anchor`.
    pub fn for_schema(schema: &Schema, anchor: impl Into<Utf8PathBuf>) -> Self {
        Self::new(anchor, schema.path_columns())
    }

    /// Leaves all values untouched.
    pub fn disabled() -> Self {
        Self::new(Utf8PathBuf::new(), Vec::new())
    }

    pub fn anchor(&self) -> &Utf8Path {
        &self.anchor
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Relative paths become absolute paths below the anchor; absolute paths,
    /// empty strings and non-textual values are returned unchanged.
    pub fn resolve(&self, value: Value) -> Value {
        match value {
            Value::Text(text) if !text.is_empty() && Utf8Path::new(&text).is_relative() => {
                Value::Path(fs_util::resolve_path(&self.anchor, Utf8Path::new(&text)))
            }
            Value::Path(path) if path.is_relative() => {
                Value::Path(fs_util::resolve_path(&self.anchor, &path))
            }
            other => other,
        }
    }

    pub fn apply(&self, table: &mut Table) {
        for column in &self.columns {
            let Some(index) = table.column_index(column) else {
                continue;
            };
            for row in 0..table.len() {
                let resolved = self.resolve(table.rows()[row][index].clone());
                // index is in range, so this cannot fail
                let _ = table.set(row, column, resolved);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeKey {
    /// Match rows by position; both sides must have the same length.
    Position,
    /// Match rows on equal values of a column present on both sides.
    Column(String),
}

#[derive(Debug, Clone)]
struct StoredRow {
    hash: ContentHash,
    values: Vec<Value>,
}

/// Read-only view of one stored record.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    hash: ContentHash,
    schema: &'a Schema,
    values: &'a [Value],
}

impl<'a> Record<'a> {
    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.values.get(self.schema.position(column)?)
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn kind(&self) -> Option<ReferenceKind> {
        self.get("type")?.as_str()?.parse().ok()
    }
}

/// Canonical, deduplicated set of sample records over a fixed schema.
///
/// Mutating calls validate their input before touching stored rows, so a
/// failed call leaves the store unchanged.
#[derive(Debug, Clone)]
pub struct RecordStore {
    schema: Schema,
    rows: Vec<StoredRow>,
}

impl RecordStore {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn zarp() -> Self {
        Self::new(Schema::zarp_model())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.rows.iter().any(|row| row.hash == *hash)
    }

    /// Appends rows, dropping unknown columns and rows already on record.
    ///
    /// Returns the number of rows appended.
    pub fn append(&mut self, rows: &Table, paths: &PathResolution) -> usize {
        debug!(rows = rows.len(), "appending sample records");
        let sanitized = self.sanitize(rows, paths);

        let mut seen = self.rows.iter().map(|row| row.hash).collect::<HashSet<_>>();
        let mut accepted = Vec::with_capacity(sanitized.len());
        let mut duplicates = Vec::new();
        for (index, values) in sanitized.into_iter().enumerate() {
            let hash = ContentHash::of(self.schema.names(), &values);
            if !seen.insert(hash) {
                trace!(index, %hash, "dropped duplicate record");
                duplicates.push(index);
                continue;
            }
            accepted.push(StoredRow { hash, values });
        }
        if !duplicates.is_empty() {
            warn!(
                ?duplicates,
                "duplicate records found in sample table at index positions; dropping"
            );
        }

        let appended = accepted.len();
        self.rows.extend(accepted);
        debug!(appended, "sample records appended");
        appended
    }

    /// Tabulates `samples` (expanding tuple fields) and appends them.
    pub fn append_samples(
        &mut self,
        samples: &[Sample],
        paths: &PathResolution,
    ) -> Result<usize, ZarpError> {
        Ok(self.append(&samples_to_table(samples)?, paths))
    }

    /// Merges column values from `rows` into existing records.
    ///
    /// Null incoming values never change a cell. Other values replace a cell
    /// if `overwrite` is set or the cell is currently null. Rows are never
    /// added or removed. Returns the number of records matched.
    pub fn update(
        &mut self,
        rows: &Table,
        key: &MergeKey,
        overwrite: bool,
        paths: &PathResolution,
    ) -> Result<usize, ZarpError> {
        debug!(rows = rows.len(), ?key, overwrite, "updating sample records");
        let mut incoming = rows.clone();
        paths.apply(&mut incoming);

        let columns = self
            .schema
            .names()
            .enumerate()
            .filter_map(|(target, name)| Some((target, incoming.column_index(name)?)))
            .collect::<Vec<_>>();

        let mut updated = self.rows.clone();
        let mut matched = 0;
        match key {
            MergeKey::Position => {
                if incoming.len() != self.rows.len() {
                    return Err(ZarpError::LengthMismatch {
                        expected: self.rows.len(),
                        actual: incoming.len(),
                    });
                }
                for (target, source) in updated.iter_mut().zip(incoming.rows()) {
                    merge_row(&mut target.values, source, &columns, overwrite);
                    matched += 1;
                }
            }
            MergeKey::Column(column) => {
                let (Some(store_key), Some(incoming_key)) =
                    (self.schema.position(column), incoming.column_index(column))
                else {
                    return Err(ZarpError::MissingColumn(column.clone()));
                };
                let mut by_key = HashMap::new();
                for (index, row) in incoming.rows().iter().enumerate() {
                    let value = &row[incoming_key];
                    if value.is_null() {
                        continue;
                    }
                    if by_key.insert(value.render(), index).is_some() {
                        return Err(ZarpError::DuplicateKey {
                            column: column.clone(),
                            key: value.render(),
                        });
                    }
                }
                for target in updated.iter_mut() {
                    let value = &target.values[store_key];
                    if value.is_null() {
                        continue;
                    }
                    if let Some(&index) = by_key.get(&value.render()) {
                        merge_row(&mut target.values, &incoming.rows()[index], &columns, overwrite);
                        matched += 1;
                    }
                }
            }
        }

        for row in &mut updated {
            row.hash = ContentHash::of(self.schema.names(), &row.values);
        }
        self.rows = updated;
        debug!(matched, "sample records updated");
        Ok(matched)
    }

    /// Logs the current records at `level`.
    pub fn view(&self, level: Level) {
        let rendered = self.table().render();
        let records = self.rows.len();
        if level == Level::ERROR {
            tracing::error!(records, "sample records:\n{rendered}");
        } else if level == Level::WARN {
            tracing::warn!(records, "sample records:\n{rendered}");
        } else if level == Level::INFO {
            tracing::info!(records, "sample records:\n{rendered}");
        } else if level == Level::DEBUG {
            tracing::debug!(records, "sample records:\n{rendered}");
        } else {
            tracing::trace!(records, "sample records:\n{rendered}");
        }
    }

    /// Snapshot of all records as a table in schema column order.
    pub fn table(&self) -> Table {
        let mut table = Table::new(self.schema.names());
        for row in &self.rows {
            // widths always match the schema
            let _ = table.push_row(row.values.clone());
        }
        table
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|row| Record {
            hash: row.hash,
            schema: &self.schema,
            values: &row.values,
        })
    }

    pub fn records_of_kind(&self, kind: ReferenceKind) -> impl Iterator<Item = Record<'_>> {
        self.records()
            .filter(move |record| record.kind() == Some(kind))
    }

    /// Projects `rows` onto the schema, resolves paths and canonicalizes nulls.
    fn sanitize(&self, rows: &Table, paths: &PathResolution) -> Vec<Vec<Value>> {
        let dropped = rows
            .columns()
            .iter()
            .filter(|column| !self.schema.contains(column))
            .collect::<Vec<_>>();
        if !dropped.is_empty() {
            debug!(?dropped, "dropping columns not in record schema");
        }

        let mut table = rows.clone();
        paths.apply(&mut table);
        let indices = self
            .schema
            .names()
            .map(|name| table.column_index(name))
            .collect::<Vec<_>>();
        table
            .rows()
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|index| match index {
                        Some(index) => row[*index].clone().canonical(),
                        None => Value::Null,
                    })
                    .collect()
            })
            .collect()
    }
}

fn merge_row(target: &mut [Value], source: &[Value], columns: &[(usize, usize)], overwrite: bool) {
    for &(to, from) in columns {
        let value = source[from].clone().canonical();
        if value.is_null() {
            continue;
        }
        if overwrite || target[to].is_null() {
            target[to] = value;
        }
    }
}
