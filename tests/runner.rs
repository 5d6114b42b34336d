use std::fs;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};
use zarp_samples::config::RunConfig;
use zarp_samples::domain::{DependencyEmbedding, ExecutionMode, ReadOrientation};
use zarp_samples::error::ZarpError;
use zarp_samples::processor::{
    DefaultsProcessor, DummyDataProcessor, MergeStrategy, ProcessorChain,
    SanitizeSourceProcessor, SequencingModeProcessor,
};
use zarp_samples::runner::{
    CommandRunner, RunState, SAMPLE_TABLE_NAME, WorkflowRunner, prepare_run_directory,
    prepare_sample_table,
};
use zarp_samples::sample::SampleConfig;
use zarp_samples::sample_table;
use zarp_samples::samples::SampleResolver;
use zarp_samples::schema::{self, ColumnMapping};
use zarp_samples::store::{PathResolution, RecordStore};
use zarp_samples::table::Table;
use zarp_samples::value::Value;

fn run_config(working_directory: Utf8PathBuf, execution_mode: ExecutionMode) -> RunConfig {
    RunConfig {
        working_directory,
        identifier: "TEST01".to_string(),
        cores: 2,
        execution_mode,
        dependency_embedding: DependencyEmbedding::Conda,
        snakefile: Utf8PathBuf::from("/workflow/Snakefile"),
        workflow_config: None,
    }
}

fn workdir(dir: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
}

#[test]
fn compile_command_follows_run_config() {
    let mut config = run_config(Utf8PathBuf::from("/work"), ExecutionMode::DryRun);
    config.dependency_embedding = DependencyEmbedding::Singularity;
    config.workflow_config = Some(Utf8PathBuf::from("/work/config.yaml"));
    let runner = CommandRunner::new(config);

    let command = runner.compile_command(Utf8Path::new("/work/samples.tsv"), Utf8Path::new("/work"));
    assert_eq!(
        command,
        [
            "snakemake",
            "--snakefile",
            "/workflow/Snakefile",
            "--cores",
            "2",
            "--directory",
            "/work",
            "--use-singularity",
            "--dry-run",
            "--configfile",
            "/work/config.yaml",
            "--config",
            "samples=/work/samples.tsv",
        ]
    );
}

#[test]
fn run_mode_has_no_dry_run_flag() {
    let runner = CommandRunner::new(run_config("/work".into(), ExecutionMode::Run));
    let command = runner.compile_command(Utf8Path::new("/work/s.tsv"), Utf8Path::new("/work"));
    assert!(command.contains(&"--use-conda".to_string()));
    assert!(!command.contains(&"--dry-run".to_string()));
}

#[test]
fn successful_command_reports_success() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner =
        CommandRunner::with_program("true", run_config(workdir(&dir), ExecutionMode::Run));
    assert_eq!(runner.state(), RunState::Unknown);

    let state = runner
        .run(&workdir(&dir).join("samples.tsv"), &workdir(&dir))
        .unwrap();
    assert_eq!(state, RunState::Success);
    assert_eq!(runner.state(), RunState::Success);
}

#[test]
fn failing_command_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner =
        CommandRunner::with_program("false", run_config(workdir(&dir), ExecutionMode::Run));

    let err = runner
        .run(&workdir(&dir).join("samples.tsv"), &workdir(&dir))
        .unwrap_err();
    assert_matches!(err, ZarpError::WorkflowFailed { command, .. } if command.starts_with("false "));
    assert_eq!(runner.state(), RunState::Error);
}

#[test]
fn missing_program_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = CommandRunner::with_program(
        "zarp-samples-no-such-program",
        run_config(workdir(&dir), ExecutionMode::Run),
    );

    let err = runner
        .run(&workdir(&dir).join("samples.tsv"), &workdir(&dir))
        .unwrap_err();
    assert_matches!(err, ZarpError::WorkflowFailed { .. });
    assert_eq!(runner.state(), RunState::Error);
}

#[test]
fn prepare_run_does_not_execute() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = CommandRunner::with_program(
        "false",
        run_config(workdir(&dir), ExecutionMode::PrepareRun),
    );

    let state = runner
        .run(&workdir(&dir).join("samples.tsv"), &workdir(&dir))
        .unwrap();
    assert_eq!(state, RunState::Unknown);
}

#[test]
fn run_directory_layout() {
    let dir = tempfile::tempdir().unwrap();
    let config = run_config(workdir(&dir), ExecutionMode::Run);

    let run_dir = prepare_run_directory(&config).unwrap();
    assert_eq!(run_dir, workdir(&dir).join("runs").join("TEST01"));
    assert!(run_dir.is_dir());
    assert!(workdir(&dir).join("results").is_dir());
    assert!(workdir(&dir).join("logs").is_dir());
}

#[test]
fn incomplete_records_are_dropped_from_workflow_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = workdir(&dir).join(SAMPLE_TABLE_NAME);
    let columns = schema::required_model_columns();
    let complete = columns
        .iter()
        .map(|column| Value::from(format!("{column}_value")))
        .collect::<Vec<_>>();
    let mut incomplete = complete.clone();
    incomplete[1] = Value::Null;
    let table = Table::from_rows(columns.clone(), vec![complete, incomplete]).unwrap();

    let written = prepare_sample_table(&table, &path).unwrap();
    assert_eq!(written, 1);

    let content = fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next().unwrap().split('\t').collect::<Vec<_>>(),
        schema::zarp_columns()
    );
    assert!(lines.next().unwrap().starts_with("name_value\t"));
    assert_eq!(lines.next(), None);
}

#[test]
fn workflow_table_requires_model_columns() {
    let dir = tempfile::tempdir().unwrap();
    let table = Table::from_rows(["name"], vec![vec![Value::from("a")]]).unwrap();

    let err = prepare_sample_table(&table, &workdir(&dir).join(SAMPLE_TABLE_NAME)).unwrap_err();
    assert_matches!(err, ZarpError::MissingColumn(_));
}

#[test]
fn configured_local_sample_reaches_workflow_table() {
    let dir = tempfile::tempdir().unwrap();
    let root = workdir(&dir);
    let reads = root.join("a.fq");
    fs::write(&reads, b"").unwrap();

    let defaults = SampleConfig {
        annotations: Some(root.join("annotations.gtf")),
        reference_sequences: Some(root.join("genome.fa")),
        source: Some("Homo sapiens".to_string()),
        read_orientation: Some(ReadOrientation::StrandedReverse),
        star_sjdb_overhang: Some(100),
        ..SampleConfig::default()
    };
    let mut resolver = SampleResolver::new(vec![format!("lib@{reads}")], defaults.clone());
    resolver.resolve().unwrap();

    let mut store = RecordStore::zarp();
    let paths = PathResolution::for_schema(store.schema(), root.clone());
    store.append_samples(resolver.samples(), &paths).unwrap();
    ProcessorChain::new()
        .with(DefaultsProcessor::new(defaults), MergeStrategy::positional())
        .with(SanitizeSourceProcessor, MergeStrategy::positional().overwrite(true))
        .with(SequencingModeProcessor, MergeStrategy::positional())
        .with(DummyDataProcessor, MergeStrategy::positional())
        .run(&mut store, &PathResolution::disabled())
        .unwrap();

    let path = root.join(SAMPLE_TABLE_NAME);
    assert_eq!(prepare_sample_table(&store.table(), &path).unwrap(), 1);

    let written =
        sample_table::read(&path, Some(&ColumnMapping::zarp_to_model()), None).unwrap();
    assert_eq!(written.get(0, "name"), Some(&Value::from("lib")));
    assert_eq!(written.get(0, "sequencing_mode"), Some(&Value::from("se")));
    assert_eq!(written.get(0, "paths_1"), Some(&Value::from(reads.as_str())));
    assert_eq!(written.get(0, "read_orientation"), Some(&Value::from("SR")));
}
