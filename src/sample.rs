use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{Accession, LibraryPaths, ReadOrientation, ReferenceKind};
use crate::error::ZarpError;
use crate::table::Table;
use crate::value::{Field, Value};

/// Fields carried as (first mate, second mate) tuples before tabulation.
pub const TUPLE_FIELDS: [&str; 5] = [
    "paths",
    "adapter_3p",
    "adapter_5p",
    "adapter_poly_3p",
    "adapter_poly_5p",
];

pub type AdapterPair = (Option<String>, Option<String>);

/// Default metadata applied to every sample before per-sample overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    pub adapter_3p: Option<AdapterPair>,
    pub adapter_5p: Option<AdapterPair>,
    pub adapter_poly_3p: Option<AdapterPair>,
    pub adapter_poly_5p: Option<AdapterPair>,
    pub annotations: Option<Utf8PathBuf>,
    pub read_orientation: Option<ReadOrientation>,
    pub reference_sequences: Option<Utf8PathBuf>,
    /// NCBI taxonomy identifier or organism name.
    pub source: Option<String>,
    pub star_sjdb_overhang: Option<u32>,
    pub salmon_kmer_size: Option<u32>,
    pub fragment_length_distribution_mean: Option<f64>,
    pub fragment_length_distribution_sd: Option<f64>,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            adapter_3p: None,
            adapter_5p: None,
            adapter_poly_3p: None,
            adapter_poly_5p: None,
            annotations: None,
            read_orientation: None,
            reference_sequences: None,
            source: None,
            star_sjdb_overhang: None,
            salmon_kmer_size: Some(31),
            fragment_length_distribution_mean: Some(300.0),
            fragment_length_distribution_sd: Some(100.0),
        }
    }
}

impl SampleConfig {
    pub fn to_fields(&self) -> Vec<(String, Field)> {
        let adapter = |pair: &Option<AdapterPair>| match pair {
            Some((first, second)) => Field::pair(first.clone(), second.clone()),
            None => Field::null(),
        };
        vec![
            (
                "fragment_length_distribution_mean".to_string(),
                Value::from(self.fragment_length_distribution_mean).into(),
            ),
            (
                "fragment_length_distribution_sd".to_string(),
                Value::from(self.fragment_length_distribution_sd).into(),
            ),
            ("adapter_3p".to_string(), adapter(&self.adapter_3p)),
            ("adapter_5p".to_string(), adapter(&self.adapter_5p)),
            ("adapter_poly_3p".to_string(), adapter(&self.adapter_poly_3p)),
            ("adapter_poly_5p".to_string(), adapter(&self.adapter_poly_5p)),
            (
                "annotations".to_string(),
                Value::from(self.annotations.clone()).into(),
            ),
            (
                "read_orientation".to_string(),
                Value::from(self.read_orientation.map(|value| value.to_string())).into(),
            ),
            (
                "reference_sequences".to_string(),
                Value::from(self.reference_sequences.clone()).into(),
            ),
            ("source".to_string(), Value::from(self.source.clone()).into()),
            (
                "star_sjdb_overhang".to_string(),
                Value::from(self.star_sjdb_overhang).into(),
            ),
            (
                "salmon_kmer_size".to_string(),
                Value::from(self.salmon_kmer_size).into(),
            ),
        ]
    }
}

/// One resolved sample as an ordered set of named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    fields: Vec<(String, Field)>,
}

impl Sample {
    /// Builds a sample from the default template and its identity fields.
    pub fn new(
        kind: ReferenceKind,
        name: Option<String>,
        identifier: Option<&Accession>,
        paths: Option<&LibraryPaths>,
        defaults: &SampleConfig,
    ) -> Self {
        let mut sample = Self {
            fields: defaults.to_fields(),
        };
        sample.set("type", Value::from(kind.as_str()).into());
        sample.set(
            "identifier",
            Value::from(identifier.map(|id| id.to_string())).into(),
        );
        sample.set("name", Value::from(name).into());
        let paths = match paths {
            Some(paths) => Field::pair(paths.first.clone(), paths.second.clone()),
            None => Field::null(),
        };
        sample.set("paths", paths);
        sample
    }

    /// Replaces the field `key`, or appends it if absent.
    pub fn set(&mut self, key: &str, field: Field) {
        match self.fields.iter_mut().find(|(name, _)| name == key) {
            Some((_, slot)) => *slot = field,
            None => self.fields.push((key.to_string(), field)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, field)| field)
    }

    /// Applies overrides on top of the current fields.
    pub fn apply(&mut self, overrides: Vec<(String, Field)>) {
        for (key, field) in overrides {
            self.set(&key, field);
        }
    }

    pub fn fields(&self) -> &[(String, Field)] {
        &self.fields
    }

    pub fn kind(&self) -> Option<ReferenceKind> {
        self.scalar_str("type")?.parse().ok()
    }

    pub fn name(&self) -> Option<&str> {
        self.scalar_str("name")
    }

    pub fn identifier(&self) -> Option<&str> {
        self.scalar_str("identifier")
    }

    fn scalar_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_scalar()?.as_str()
    }
}

/// Tabulates samples, spreading tuple-valued fields over numbered columns.
///
/// Columns appear in order of first occurrence; fields a sample lacks are null.
pub fn samples_to_table(samples: &[Sample]) -> Result<Table, ZarpError> {
    let mut columns: Vec<String> = Vec::new();
    for sample in samples {
        for (name, _) in sample.fields() {
            if !columns.contains(name) {
                columns.push(name.clone());
            }
        }
    }
    let rows = samples
        .iter()
        .map(|sample| {
            columns
                .iter()
                .map(|name| sample.get(name).cloned().unwrap_or_else(Field::null))
                .collect()
        })
        .collect();
    expand_tuple_columns(columns, rows)
}

/// Replaces every column holding at least one tuple by `{name}_1 .. {name}_k`,
/// `k` being the longest tuple in that column.
///
/// Shorter tuples are padded with nulls on the right; a scalar fills the first
/// slot. New columns take the place of the tuple column and replace any
/// existing column of the same name. Rows must be as wide as `columns`.
pub fn expand_tuple_columns(
    columns: Vec<String>,
    rows: Vec<Vec<Field>>,
) -> Result<Table, ZarpError> {
    if let Some((index, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != columns.len())
    {
        return Err(ZarpError::TableParse(format!(
            "row {} has {} fields, expected {}",
            index + 1,
            row.len(),
            columns.len()
        )));
    }
    let mut names: Vec<String> = Vec::new();
    let mut cells: Vec<Vec<Value>> = vec![Vec::new(); rows.len()];

    for (index, name) in columns.iter().enumerate() {
        let width = rows
            .iter()
            .filter_map(|row| match &row[index] {
                Field::Tuple(values) => Some(values.len()),
                Field::Scalar(_) => None,
            })
            .max();

        let expanded = match width {
            None => vec![(name.clone(), None)],
            Some(width) => (1..=width)
                .map(|slot| (format!("{name}_{slot}"), Some(slot - 1)))
                .collect(),
        };

        for (column, slot) in expanded {
            let position = match names.iter().position(|existing| *existing == column) {
                Some(position) => position,
                None => {
                    names.push(column);
                    for row in &mut cells {
                        row.push(Value::Null);
                    }
                    names.len() - 1
                }
            };
            for (row, out) in rows.iter().zip(cells.iter_mut()) {
                out[position] = match (&row[index], slot) {
                    (Field::Scalar(value), None) => value.clone(),
                    (Field::Scalar(value), Some(0)) => value.clone(),
                    (Field::Scalar(_), Some(_)) => Value::Null,
                    (Field::Tuple(values), Some(slot)) => {
                        values.get(slot).cloned().unwrap_or(Value::Null)
                    }
                    (Field::Tuple(_), None) => Value::Null,
                };
            }
        }
    }

    Table::from_rows(names, cells)
}
