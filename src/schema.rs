//! Column schemas and name mappings for sample records and tables.

use std::collections::HashSet;

use crate::error::ZarpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    /// Values are file system paths and get resolved against an anchor.
    Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered, immutable list of record columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Result<Self, ZarpError> {
        if columns.is_empty() {
            return Err(ZarpError::InvalidSchema("schema has no columns".to_string()));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if column.name.is_empty() {
                return Err(ZarpError::InvalidSchema("empty column name".to_string()));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(ZarpError::InvalidSchema(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Model columns of the ZARP sample record store.
    pub fn zarp_model() -> Self {
        let columns = ZARP_TO_MODEL
            .iter()
            .map(|(_, model)| *model)
            .chain(["assembly", "identifier", "source_sanitized", "type"])
            .map(|name| Column {
                name: name.to_string(),
                kind: if MODEL_PATH_COLUMNS.contains(&name) {
                    ColumnKind::Path
                } else {
                    ColumnKind::Text
                },
            })
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn path_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|column| column.kind == ColumnKind::Path)
            .map(|column| column.name.clone())
            .collect()
    }
}

/// ZARP sample table column names and their record model counterparts.
pub const ZARP_TO_MODEL: [(&str, &str); 20] = [
    ("sample", "name"),
    ("organism", "source"),
    ("gtf", "annotations"),
    ("genome", "reference_sequences"),
    ("sd", "fragment_length_distribution_sd"),
    ("mean", "fragment_length_distribution_mean"),
    ("libtype", "read_orientation"),
    ("index_size", "star_sjdb_overhang"),
    ("kmer", "salmon_kmer_size"),
    ("fq1", "paths_1"),
    ("fq2", "paths_2"),
    ("fq1_3p", "adapter_3p_1"),
    ("fq2_3p", "adapter_3p_2"),
    ("fq1_5p", "adapter_5p_1"),
    ("fq2_5p", "adapter_5p_2"),
    ("fq1_polya_3p", "adapter_poly_3p_1"),
    ("fq2_polya_3p", "adapter_poly_3p_2"),
    ("fq1_polya_5p", "adapter_poly_5p_1"),
    ("fq2_polya_5p", "adapter_poly_5p_2"),
    ("seqmode", "sequencing_mode"),
];

/// ZARP sample table columns in the order the workflow expects them.
pub fn zarp_columns() -> Vec<&'static str> {
    ZARP_TO_MODEL.iter().map(|(zarp, _)| *zarp).collect()
}

/// Record model columns that must be populated before a workflow run.
pub fn required_model_columns() -> Vec<&'static str> {
    ZARP_TO_MODEL.iter().map(|(_, model)| *model).collect()
}

/// Record model columns holding paths.
pub const MODEL_PATH_COLUMNS: [&str; 4] =
    ["paths_1", "paths_2", "annotations", "reference_sequences"];

/// Bijective renaming between two sets of column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pairs: Vec<(String, String)>,
}

impl ColumnMapping {
    pub fn new<I, K, V>(pairs: I) -> Result<Self, ZarpError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(from, to)| (from.into(), to.into()))
            .collect::<Vec<_>>();
        let mut sources = HashSet::new();
        let mut targets = HashSet::new();
        for (from, to) in &pairs {
            if !sources.insert(from.as_str()) || !targets.insert(to.as_str()) {
                return Err(ZarpError::InvalidMapping(format!(
                    "'{from}' -> '{to}' is not one-to-one"
                )));
            }
        }
        Ok(Self { pairs })
    }

    fn from_static(pairs: &[(&str, &str)]) -> Self {
        Self {
            pairs: pairs
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    /// ZARP sample table columns to record model columns.
    pub fn zarp_to_model() -> Self {
        Self::from_static(&ZARP_TO_MODEL)
    }

    /// Record model columns to ZARP sample table columns.
    pub fn model_to_zarp() -> Self {
        Self::zarp_to_model().inverse()
    }

    /// Record columns to the input table of the read archive download workflow.
    pub fn model_to_sra_input() -> Self {
        Self::from_static(&[("identifier", "sample")])
    }

    /// Output table of the read archive download workflow to record columns.
    pub fn sra_output_to_model() -> Self {
        Self::from_static(&[
            ("sample", "identifier"),
            ("fq1", "paths_1"),
            ("fq2", "paths_2"),
        ])
    }

    pub fn inverse(&self) -> Self {
        Self {
            pairs: self
                .pairs
                .iter()
                .map(|(from, to)| (to.clone(), from.clone()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(from, _)| from == name)
            .map(|(_, to)| to.as_str())
    }

    /// Mapped name, or `name` itself if it is not part of the mapping.
    pub fn apply<'a>(&'a self, name: &'a str) -> &'a str {
        self.get(name).unwrap_or(name)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(from, _)| from.as_str())
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(_, to)| to.as_str())
    }
}
