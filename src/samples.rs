//! Resolution of sample references into sample objects.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};

use crate::domain::{Accession, LibraryPaths, ReferenceKind, ReferenceTarget};
use crate::error::ZarpError;
use crate::fs_util;
use crate::reference;
use crate::sample::{Sample, SampleConfig, TUPLE_FIELDS, samples_to_table};
use crate::sample_table;
use crate::schema::{self, ColumnMapping, Schema};
use crate::store::PathResolution;
use crate::table::Table;
use crate::value::{Field, Value};

/// Turns raw sample references into [`Sample`]s.
pub struct SampleResolver {
    references: Vec<String>,
    defaults: SampleConfig,
    samples: Vec<Sample>,
}

/// How a row of a sample table resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RowTarget {
    Library(LibraryPaths),
    Remote(Accession),
    /// Both a local library and an explicit accession.
    Ambiguous,
    Unmatched,
}

impl SampleResolver {
    pub fn new(references: Vec<String>, defaults: SampleConfig) -> Self {
        Self {
            references,
            defaults,
            samples: Vec::new(),
        }
    }

    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Classifies every reference and builds its sample(s).
    ///
    /// Invalid references and unmatched table rows are skipped with a warning.
    /// A sample table that cannot be read is an error.
    pub fn resolve(&mut self) -> Result<&[Sample], ZarpError> {
        self.samples.clear();
        for raw in &self.references {
            let reference = reference::classify(raw);
            match reference.target {
                ReferenceTarget::Library(paths) => {
                    let sample = local_sample(reference.name, &paths, &self.defaults, Vec::new());
                    self.samples.push(sample);
                }
                ReferenceTarget::Remote(accession) => {
                    let sample =
                        remote_sample(reference.name, &accession, &self.defaults, Vec::new());
                    self.samples.push(sample);
                }
                ReferenceTarget::Table(path) => {
                    let samples = table_samples(&path, &self.defaults)?;
                    self.samples.extend(samples);
                }
                ReferenceTarget::Invalid => warn!(
                    reference = %raw,
                    "cannot determine type of sample reference; check spelling and refer to documentation for supported syntax; skipping"
                ),
            }
        }
        info!(
            samples = self.samples.len(),
            remote = self.remote_samples().count(),
            "sample references resolved"
        );
        Ok(&self.samples)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Samples that still have to be fetched from a read archive.
    pub fn remote_samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples
            .iter()
            .filter(|sample| sample.kind() == Some(ReferenceKind::RemoteAccession))
    }
}

/// Writes `samples` as a ZARP sample table.
pub fn write_sample_table(samples: &[Sample], path: &Utf8Path) -> Result<Utf8PathBuf, ZarpError> {
    let table = samples_to_table(samples)?;
    let columns = schema::zarp_columns();
    sample_table::write(
        &table,
        path,
        Some(&ColumnMapping::model_to_zarp()),
        Some(&columns),
    )?;
    Ok(path.to_path_buf())
}

/// Writes the accessions of `samples` as input table for the read archive
/// download workflow.
pub fn write_remote_sample_table<'a>(
    samples: impl IntoIterator<Item = &'a Sample>,
    path: &Utf8Path,
) -> Result<Utf8PathBuf, ZarpError> {
    let mut table = Table::new(["identifier"]);
    for sample in samples {
        table.push_row(vec![Value::from(sample.identifier())])?;
    }
    let mapping = ColumnMapping::model_to_sra_input();
    let columns = mapping.targets().collect::<Vec<_>>();
    sample_table::write(&table, path, Some(&mapping), Some(&columns))?;
    Ok(path.to_path_buf())
}

fn local_sample(
    name: Option<String>,
    paths: &LibraryPaths,
    defaults: &SampleConfig,
    overrides: Vec<(String, Field)>,
) -> Sample {
    let kind = if paths.is_paired() {
        ReferenceKind::LocalPaired
    } else {
        ReferenceKind::LocalSingle
    };
    let name = name.unwrap_or_else(|| default_name(paths));
    let mut sample = Sample::new(kind, Some(name), None, Some(paths), defaults);
    sample.apply(overrides);
    sample
}

fn remote_sample(
    name: Option<String>,
    accession: &Accession,
    defaults: &SampleConfig,
    overrides: Vec<(String, Field)>,
) -> Sample {
    let name = name.unwrap_or_else(|| accession.to_string());
    let mut sample = Sample::new(
        ReferenceKind::RemoteAccession,
        Some(name),
        Some(accession),
        None,
        defaults,
    );
    sample.apply(overrides);
    sample
}

/// Longest common prefix of the library's file stems.
fn default_name(paths: &LibraryPaths) -> String {
    let mut stems = paths.iter().filter_map(Utf8Path::file_stem);
    let Some(first) = stems.next() else {
        return String::new();
    };
    let mut prefix = first.to_string();
    for stem in stems {
        let shared = prefix
            .chars()
            .zip(stem.chars())
            .take_while(|(left, right)| left == right)
            .map(|(ch, _)| ch.len_utf8())
            .sum();
        prefix.truncate(shared);
    }
    prefix
}

fn table_samples(path: &Utf8Path, defaults: &SampleConfig) -> Result<Vec<Sample>, ZarpError> {
    let table = sample_table::read(path, Some(&ColumnMapping::zarp_to_model()), None)?;
    let paths = PathResolution::for_schema(&Schema::zarp_model(), sample_table::anchor_of(path));

    let mut samples = Vec::with_capacity(table.len());
    for (index, row) in table.rows().iter().enumerate() {
        let cells = row_cells(table.columns(), row, &paths);
        let target = row_target(&cells);
        debug!(table = %path, row = index + 1, ?target, "resolved sample table row");
        match target {
            RowTarget::Library(library) => {
                let name = scalar_text(&cells, "name");
                let overrides = row_overrides(cells, &["type", "paths"]);
                samples.push(local_sample(name, &library, defaults, overrides));
            }
            RowTarget::Remote(accession) => {
                let name = scalar_text(&cells, "name");
                let overrides = row_overrides(cells, &["type", "paths", "identifier"]);
                samples.push(remote_sample(name, &accession, defaults, overrides));
            }
            RowTarget::Ambiguous => warn!(
                table = %path,
                row = index + 1,
                "sample table row names both local files and a read archive identifier; skipping"
            ),
            RowTarget::Unmatched => warn!(
                table = %path,
                row = index + 1,
                "cannot determine type of sample reference for sample table row; check spelling and refer to documentation for supported syntax; skipping"
            ),
        }
    }
    Ok(samples)
}

/// Non-empty cells of a table row with paths resolved and numbered tuple
/// columns folded back into tuples.
fn row_cells(columns: &[String], row: &[Value], paths: &PathResolution) -> Vec<(String, Field)> {
    let mut cells = columns
        .iter()
        .zip(row)
        .filter(|(_, value)| !value.is_blank())
        .map(|(column, value)| {
            let value = if paths.columns().contains(column) {
                paths.resolve(value.clone())
            } else {
                value.clone()
            };
            (column.clone(), value)
        })
        .collect::<Vec<_>>();

    let mut fields = Vec::with_capacity(cells.len());
    for name in TUPLE_FIELDS {
        let first = take_cell(&mut cells, &format!("{name}_1"));
        let second = take_cell(&mut cells, &format!("{name}_2"));
        if first.is_some() || second.is_some() {
            fields.push((name.to_string(), Field::pair(first, second)));
        }
    }
    fields.extend(cells.into_iter().map(|(column, value)| (column, value.into())));
    fields
}

fn take_cell(cells: &mut Vec<(String, Value)>, column: &str) -> Option<Value> {
    let index = cells.iter().position(|(name, _)| name == column)?;
    Some(cells.remove(index).1)
}

fn row_target(cells: &[(String, Field)]) -> RowTarget {
    let (first, second) = match cells.iter().find(|(name, _)| name == "paths") {
        Some((_, Field::Tuple(values))) => (
            values.first().and_then(Value::as_path).map(Utf8Path::to_path_buf),
            values.get(1).and_then(Value::as_path).map(Utf8Path::to_path_buf),
        ),
        _ => (None, None),
    };
    let explicit = scalar_text(cells, "identifier").and_then(|id| id.parse::<Accession>().ok());

    let Some(first) = first else {
        let accession =
            explicit.or_else(|| scalar_text(cells, "name").and_then(|name| name.parse().ok()));
        return accession.map_or(RowTarget::Unmatched, RowTarget::Remote);
    };
    let library = match second {
        None if fs_util::is_file(first.as_str()) => LibraryPaths::single(first),
        Some(second) if fs_util::is_file(first.as_str()) && fs_util::is_file(second.as_str()) => {
            LibraryPaths::paired(first, second)
        }
        _ => return RowTarget::Unmatched,
    };
    if explicit.is_some() {
        return RowTarget::Ambiguous;
    }
    RowTarget::Library(library)
}

fn scalar_text(cells: &[(String, Field)], column: &str) -> Option<String> {
    cells
        .iter()
        .find(|(name, _)| name == column)?
        .1
        .as_scalar()?
        .as_str()
        .map(str::to_string)
}

fn row_overrides(cells: Vec<(String, Field)>, skip: &[&str]) -> Vec<(String, Field)> {
    cells
        .into_iter()
        .filter(|(name, _)| !skip.contains(&name.as_str()))
        .collect()
}
