use std::fs;
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::domain::{DependencyEmbedding, ExecutionMode};
use crate::error::ZarpError;
use crate::sample_table;
use crate::schema::{self, ColumnMapping};
use crate::table::Table;

/// File name of the sample table handed to the workflow.
pub const SAMPLE_TABLE_NAME: &str = "samples_zarp.tsv";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    #[default]
    Unknown,
    Success,
    Error,
}

/// Executes the analysis workflow on a finalized sample table.
pub trait WorkflowRunner {
    fn run(
        &mut self,
        sample_table: &Utf8Path,
        working_dir: &Utf8Path,
    ) -> Result<RunState, ZarpError>;
    fn state(&self) -> RunState;
}

/// Runs a Snakemake-compatible command line.
pub struct CommandRunner {
    program: String,
    config: RunConfig,
    state: RunState,
}

impl CommandRunner {
    pub fn new(config: RunConfig) -> Self {
        Self::with_program("snakemake", config)
    }

    pub fn with_program(program: &str, config: RunConfig) -> Self {
        Self {
            program: program.to_string(),
            config,
            state: RunState::Unknown,
        }
    }

    pub fn compile_command(&self, sample_table: &Utf8Path, working_dir: &Utf8Path) -> Vec<String> {
        let mut command = vec![
            self.program.clone(),
            "--snakefile".to_string(),
            self.config.snakefile.to_string(),
            "--cores".to_string(),
            self.config.cores.to_string(),
            "--directory".to_string(),
            working_dir.to_string(),
        ];
        command.push(
            match self.config.dependency_embedding {
                DependencyEmbedding::Conda => "--use-conda",
                DependencyEmbedding::Singularity => "--use-singularity",
            }
            .to_string(),
        );
        if matches!(
            self.config.execution_mode,
            ExecutionMode::DryRun | ExecutionMode::PrepareRun
        ) {
            command.push("--dry-run".to_string());
        }
        if let Some(workflow_config) = &self.config.workflow_config {
            command.push("--configfile".to_string());
            command.push(workflow_config.to_string());
        }
        command.push("--config".to_string());
        command.push(format!("samples={sample_table}"));
        command
    }

    fn execute(&self, command: &[String], working_dir: &Utf8Path) -> Result<(), ZarpError> {
        let rendered = command.join(" ");
        let Some((program, args)) = command.split_first() else {
            return Ok(());
        };
        let status = Command::new(program)
            .args(args)
            .current_dir(working_dir.as_std_path())
            .status()
            .map_err(|err| ZarpError::WorkflowFailed {
                command: rendered.clone(),
                status: err.to_string(),
            })?;
        if status.success() {
            return Ok(());
        }
        Err(ZarpError::WorkflowFailed {
            command: rendered,
            status: status.to_string(),
        })
    }
}

impl WorkflowRunner for CommandRunner {
    fn run(
        &mut self,
        sample_table: &Utf8Path,
        working_dir: &Utf8Path,
    ) -> Result<RunState, ZarpError> {
        let command = self.compile_command(sample_table, working_dir);
        debug!(command = %command.join(" "), "workflow command");
        if self.config.execution_mode == ExecutionMode::PrepareRun {
            info!("workflow run is ready to execute (use execution mode RUN)");
            return Ok(self.state);
        }
        info!(identifier = %self.config.identifier, "executing workflow");
        match self.execute(&command, working_dir) {
            Ok(()) => {
                self.state = RunState::Success;
                Ok(self.state)
            }
            Err(err) => {
                self.state = RunState::Error;
                Err(err)
            }
        }
    }

    fn state(&self) -> RunState {
        self.state
    }
}

/// Creates the run directory `<working_dir>/runs/<identifier>` and returns it.
pub fn prepare_run_directory(config: &RunConfig) -> Result<Utf8PathBuf, ZarpError> {
    let run_dir = config
        .working_directory
        .join("runs")
        .join(&config.identifier);
    for dir in [
        run_dir.clone(),
        config.working_directory.join("results"),
        config.working_directory.join("logs"),
    ] {
        fs::create_dir_all(dir.as_std_path()).map_err(|err| {
            ZarpError::Filesystem(format!("failed to create directory {dir}: {err}"))
        })?;
    }
    Ok(run_dir)
}

/// Writes the records that carry every column the workflow needs as a ZARP
/// sample table and returns how many were written.
///
/// Records with missing metadata are dropped with a warning.
pub fn prepare_sample_table(records: &Table, path: &Utf8Path) -> Result<usize, ZarpError> {
    let required = schema::required_model_columns();
    for column in &required {
        if !records.has_column(column) {
            return Err(ZarpError::MissingColumn(column.to_string()));
        }
    }
    let complete = records.filter_rows(|index, row| {
        let missing = required
            .iter()
            .filter(|column| {
                records
                    .column_index(column)
                    .is_some_and(|position| row[position].is_null())
            })
            .copied()
            .collect::<Vec<_>>();
        if missing.is_empty() {
            return true;
        }
        let name = records
            .get(index, "name")
            .map(ToString::to_string)
            .unwrap_or_default();
        warn!(sample = %name, ?missing, "sample is dropped due to missing metadata");
        false
    });
    let columns = schema::zarp_columns();
    sample_table::write(
        &complete,
        path,
        Some(&ColumnMapping::model_to_zarp()),
        Some(&columns),
    )?;
    info!(records = complete.len(), %path, "workflow sample table written");
    Ok(complete.len())
}
