use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::domain::ReferenceKind;
use crate::error::ZarpError;
use crate::fs_util;
use crate::sample::{SampleConfig, expand_tuple_columns};
use crate::sample_table;
use crate::schema::ColumnMapping;
use crate::store::{MergeKey, PathResolution, RecordStore};
use crate::table::Table;
use crate::value::{Field, Value};

/// Placeholder for metadata the workflow requires but a sample may lack.
pub const DUMMY_DATA: &str = "XXXXXXXXXXXXXXXX";

/// Record columns filled with [`DUMMY_DATA`] when empty.
pub const DUMMY_COLUMNS: [&str; 10] = [
    "name",
    "paths_2",
    "adapter_3p_1",
    "adapter_3p_2",
    "adapter_5p_1",
    "adapter_5p_2",
    "adapter_poly_3p_1",
    "adapter_poly_3p_2",
    "adapter_poly_5p_1",
    "adapter_poly_5p_2",
];

/// A collaborator that receives the current records and returns a table with
/// the same or additional columns.
///
/// The returned table is never stored as is; it is merged back into the
/// record store according to a [`MergeStrategy`].
pub trait RecordProcessor: Send + Sync {
    fn name(&self) -> &str;
    fn process(&self, records: &Table) -> Result<Table, ZarpError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeStrategy {
    pub key: MergeKey,
    pub overwrite: bool,
}

impl MergeStrategy {
    pub fn positional() -> Self {
        Self {
            key: MergeKey::Position,
            overwrite: false,
        }
    }

    pub fn by(column: &str) -> Self {
        Self {
            key: MergeKey::Column(column.to_string()),
            overwrite: false,
        }
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

impl Default for MergeStrategy {
    fn default() -> Self {
        Self::positional()
    }
}

/// Offers the default-metadata template for every record.
pub struct DefaultsProcessor {
    defaults: SampleConfig,
}

impl DefaultsProcessor {
    pub fn new(defaults: SampleConfig) -> Self {
        Self { defaults }
    }
}

impl RecordProcessor for DefaultsProcessor {
    fn name(&self) -> &str {
        "defaults"
    }

    fn process(&self, records: &Table) -> Result<Table, ZarpError> {
        let template = self.defaults.to_fields();
        let columns = template.iter().map(|(name, _)| name.clone()).collect();
        let row = template
            .into_iter()
            .map(|(_, field)| field)
            .collect::<Vec<Field>>();
        let table = expand_tuple_columns(columns, vec![row; records.len()])?;
        debug!(records = table.len(), columns = table.columns().len(), "defaults prepared");
        Ok(table)
    }
}

/// Offers [`DUMMY_DATA`] for the columns in [`DUMMY_COLUMNS`].
pub struct DummyDataProcessor;

impl RecordProcessor for DummyDataProcessor {
    fn name(&self) -> &str {
        "dummy_data"
    }

    fn process(&self, records: &Table) -> Result<Table, ZarpError> {
        if records.is_empty() {
            debug!("no dummy data to set");
        }
        let row = vec![Value::from(DUMMY_DATA); DUMMY_COLUMNS.len()];
        Table::from_rows(DUMMY_COLUMNS, vec![row; records.len()])
    }
}

/// Derives `source_sanitized` from `source`.
pub struct SanitizeSourceProcessor;

impl RecordProcessor for SanitizeSourceProcessor {
    fn name(&self) -> &str {
        "sanitize_source"
    }

    fn process(&self, records: &Table) -> Result<Table, ZarpError> {
        let mut table = Table::new(["source_sanitized"]);
        let Some(sources) = records.column("source") else {
            for _ in 0..records.len() {
                table.push_row(vec![Value::Null])?;
            }
            return Ok(table);
        };
        for source in sources {
            let sanitized = match source {
                value if value.is_null() => Value::Null,
                value => Value::from(fs_util::sanitize_string(&value.render())),
            };
            table.push_row(vec![sanitized])?;
        }
        Ok(table)
    }
}

/// `sequencing_mode` value of paired-end libraries.
pub const PAIRED_END: &str = "pe";

/// `sequencing_mode` value of single-end libraries.
pub const SINGLE_END: &str = "se";

/// Derives `sequencing_mode` from the record type, or from the read paths for
/// records that are not local libraries (e.g. downloaded accessions).
pub struct SequencingModeProcessor;

impl SequencingModeProcessor {
    fn mode(records: &Table, row: usize) -> Value {
        let kind = records
            .get(row, "type")
            .and_then(Value::as_str)
            .and_then(|kind| kind.parse::<ReferenceKind>().ok());
        match kind {
            Some(ReferenceKind::LocalPaired) => return Value::from(PAIRED_END),
            Some(ReferenceKind::LocalSingle) => return Value::from(SINGLE_END),
            _ => {}
        }
        let has_path = |column: &str| {
            records
                .get(row, column)
                .is_some_and(|value| !value.is_blank() && value.as_str() != Some(DUMMY_DATA))
        };
        match (has_path("paths_1"), has_path("paths_2")) {
            (true, true) => Value::from(PAIRED_END),
            (true, false) => Value::from(SINGLE_END),
            _ => Value::Null,
        }
    }
}

impl RecordProcessor for SequencingModeProcessor {
    fn name(&self) -> &str {
        "sequencing_mode"
    }

    fn process(&self, records: &Table) -> Result<Table, ZarpError> {
        let mut table = Table::new(["sequencing_mode"]);
        for row in 0..records.len() {
            table.push_row(vec![Self::mode(records, row)])?;
        }
        Ok(table)
    }
}

/// Offers the local read paths listed in the output table of the read archive
/// download workflow, keyed by `identifier`.
///
/// Relative paths resolve against the table's directory; empty cells are
/// offered as null so they never clear a stored path.
pub struct RemoteDownloadsProcessor {
    table: Utf8PathBuf,
}

impl RemoteDownloadsProcessor {
    pub fn new(table: impl Into<Utf8PathBuf>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &Utf8Path {
        &self.table
    }

    /// Merge strategy that folds downloads back into the matching records.
    pub fn strategy() -> MergeStrategy {
        MergeStrategy::by("identifier").overwrite(true)
    }
}

impl RecordProcessor for RemoteDownloadsProcessor {
    fn name(&self) -> &str {
        "remote_downloads"
    }

    fn process(&self, _records: &Table) -> Result<Table, ZarpError> {
        let mapping = ColumnMapping::sra_output_to_model();
        let columns = mapping.sources().collect::<Vec<_>>();
        let mut downloads =
            sample_table::read(&self.table, Some(&mapping), Some(columns.as_slice()))?;
        PathResolution::new(
            sample_table::anchor_of(&self.table),
            vec!["paths_1".to_string(), "paths_2".to_string()],
        )
        .apply(&mut downloads);

        let mut table = Table::new(downloads.columns().iter().map(String::as_str));
        for row in downloads.rows() {
            let row = row
                .iter()
                .map(|value| if value.is_blank() { Value::Null } else { value.clone() })
                .collect();
            table.push_row(row)?;
        }
        info!(table = %self.table, downloads = table.len(), "remote downloads read");
        Ok(table)
    }
}

/// Processors run one after the other, each result merged into the store
/// before the next processor sees the records.
#[derive(Default)]
pub struct ProcessorChain {
    steps: Vec<(Box<dyn RecordProcessor>, MergeStrategy)>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, processor: impl RecordProcessor + 'static, strategy: MergeStrategy) -> Self {
        self.push(Box::new(processor), strategy);
        self
    }

    pub fn push(&mut self, processor: Box<dyn RecordProcessor>, strategy: MergeStrategy) {
        self.steps.push((processor, strategy));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs all processors against `store`.
    ///
    /// The first failure stops the chain. Merges of earlier processors stay
    /// in the store.
    pub fn run(&self, store: &mut RecordStore, paths: &PathResolution) -> Result<(), ZarpError> {
        for (processor, strategy) in &self.steps {
            let name = processor.name();
            info!(processor = name, "running sample processor");
            let records = store.table();
            let result = processor.process(&records).map_err(|err| match err {
                ZarpError::Processor { .. } => err,
                other => ZarpError::Processor {
                    name: name.to_string(),
                    message: other.to_string(),
                },
            })?;
            let matched = store.update(&result, &strategy.key, strategy.overwrite, paths)?;
            debug!(processor = name, matched, "sample processor results merged");
        }
        Ok(())
    }
}
