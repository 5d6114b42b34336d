use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use zarp_samples::config::{Config, ConfigLoader, ResolvedConfig};
use zarp_samples::domain::{DependencyEmbedding, ExecutionMode, is_valid_label};
use zarp_samples::error::ZarpError;
use zarp_samples::fs_util;
use zarp_samples::output::{JsonOutput, ResolveSummary, RunSummary};
use zarp_samples::processor::{
    DefaultsProcessor, DummyDataProcessor, MergeStrategy, ProcessorChain,
    RemoteDownloadsProcessor, SanitizeSourceProcessor, SequencingModeProcessor,
};
use zarp_samples::runner::{self, CommandRunner, RunState, WorkflowRunner};
use zarp_samples::sample_table;
use zarp_samples::samples::{SampleResolver, write_remote_sample_table};
use zarp_samples::schema::{self, ColumnMapping};
use zarp_samples::store::{PathResolution, RecordStore};

#[derive(Parser)]
#[command(name = "zarp-samples")]
#[command(about = "Resolve sequencing sample references into a ZARP sample table")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Resolve sample references and write sample tables")]
    Resolve(ResolveArgs),
    #[command(about = "Resolve sample references and run the workflow on them")]
    Run(RunArgs),
}

#[derive(Args)]
struct SourceArgs {
    /// Sample references: file paths, `a.fq,b.fq` pairs, accessions,
    /// `name@...` variants or `table:path`.
    references: Vec<String>,

    #[arg(long)]
    config: Option<String>,

    /// Directory relative record paths are resolved against.
    #[arg(long)]
    anchor: Option<Utf8PathBuf>,

    /// Output sample table of the read archive download workflow; its local
    /// paths are folded into the matching remote records.
    #[arg(long)]
    downloads: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct ResolveArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(long)]
    output: Option<Utf8PathBuf>,

    #[arg(long)]
    remote_output: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(long)]
    identifier: Option<String>,

    #[arg(long)]
    working_directory: Option<Utf8PathBuf>,

    #[arg(long)]
    cores: Option<u32>,

    #[arg(long)]
    execution_mode: Option<ExecutionMode>,

    #[arg(long)]
    dependency_embedding: Option<DependencyEmbedding>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(zarp) = report.downcast_ref::<ZarpError>() {
            return ExitCode::from(map_exit_code(zarp));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ZarpError) -> u8 {
    match error {
        ZarpError::MissingConfig => 2,
        ZarpError::ConfigRead(_) | ZarpError::ConfigParse(_) => 2,
        ZarpError::TableRead { .. } | ZarpError::TableParse(_) => 2,
        ZarpError::WorkflowFailed { .. } | ZarpError::Processor { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Resolve(args) => run_resolve(args),
        Commands::Run(args) => run_workflow(args),
    }
}

/// Resolved references merged into a store with defaults applied.
struct Resolution {
    config: ResolvedConfig,
    resolver: SampleResolver,
    store: RecordStore,
}

fn resolve_records(source: &SourceArgs) -> miette::Result<Resolution> {
    let config = match ConfigLoader::resolve(source.config.as_deref()) {
        Ok(config) => config,
        Err(ZarpError::MissingConfig) if !source.references.is_empty() => {
            ConfigLoader::resolve_config(Config::default())?
        }
        Err(err) => return Err(err.into()),
    };

    let references = if source.references.is_empty() {
        config.references.clone()
    } else {
        source.references.clone()
    };
    if references.is_empty() {
        return Err(miette::Report::msg(
            "no sample references given (pass them as arguments or in the config file)",
        ));
    }

    let mut resolver = SampleResolver::new(references, config.sample.clone());
    resolver.resolve()?;

    let anchor = match &source.anchor {
        Some(anchor) => fs_util::absolute(anchor),
        None => fs_util::absolute(Utf8Path::new(".")),
    };
    let mut store = RecordStore::zarp();
    let paths = PathResolution::for_schema(store.schema(), anchor);
    store.append_samples(resolver.samples(), &paths)?;

    let mut chain = ProcessorChain::new().with(
        DefaultsProcessor::new(config.sample.clone()),
        MergeStrategy::positional(),
    );
    if let Some(downloads) = &source.downloads {
        chain = chain.with(
            RemoteDownloadsProcessor::new(downloads.clone()),
            RemoteDownloadsProcessor::strategy(),
        );
    }
    chain
        .with(SanitizeSourceProcessor, MergeStrategy::positional().overwrite(true))
        .with(SequencingModeProcessor, MergeStrategy::positional())
        .run(&mut store, &paths)?;
    store.view(Level::DEBUG);

    Ok(Resolution {
        config,
        resolver,
        store,
    })
}

fn run_resolve(args: ResolveArgs) -> miette::Result<()> {
    let Resolution { resolver, store, .. } = resolve_records(&args.source)?;

    if let Some(path) = &args.output {
        let columns = schema::zarp_columns();
        sample_table::write(
            &store.table(),
            path,
            Some(&ColumnMapping::model_to_zarp()),
            Some(&columns),
        )?;
        info!(%path, "sample table written");
    }
    if let Some(path) = &args.remote_output {
        write_remote_sample_table(resolver.remote_samples(), path)?;
        info!(%path, "remote sample table written");
    }

    let summary = ResolveSummary {
        references: resolver.references().len(),
        samples: resolver.samples().len(),
        remote_samples: resolver.remote_samples().count(),
        records: store.len(),
        sample_table: args.output.map(|path| path.to_string()),
        remote_sample_table: args.remote_output.map(|path| path.to_string()),
    };
    JsonOutput::print_resolve(&summary).into_diagnostic()?;
    Ok(())
}

fn run_workflow(args: RunArgs) -> miette::Result<()> {
    let Resolution {
        mut config,
        mut store,
        ..
    } = resolve_records(&args.source)?;

    if let Some(identifier) = args.identifier {
        if !is_valid_label(&identifier) {
            return Err(ZarpError::ConfigParse(format!("invalid run identifier '{identifier}'")).into());
        }
        config.run.identifier = identifier;
    }
    if let Some(dir) = &args.working_directory {
        config.run.working_directory = fs_util::absolute(dir);
    }
    if let Some(cores) = args.cores {
        if cores == 0 {
            return Err(ZarpError::ConfigParse("run cores must be at least 1".to_string()).into());
        }
        config.run.cores = cores;
    }
    if let Some(mode) = args.execution_mode {
        config.run.execution_mode = mode;
    }
    if let Some(embedding) = args.dependency_embedding {
        config.run.dependency_embedding = embedding;
    }

    let paths = PathResolution::disabled();
    ProcessorChain::new()
        .with(DummyDataProcessor, MergeStrategy::positional())
        .run(&mut store, &paths)?;

    let run_dir = runner::prepare_run_directory(&config.run)?;
    let sample_table = run_dir.join(runner::SAMPLE_TABLE_NAME);
    let records = runner::prepare_sample_table(&store.table(), &sample_table)?;

    let state = if records == 0 {
        info!("no samples to run");
        RunState::Unknown
    } else {
        let mut workflow = CommandRunner::new(config.run.clone());
        workflow.run(&sample_table, &config.run.working_directory)?
    };

    let summary = RunSummary {
        identifier: config.run.identifier.clone(),
        records,
        sample_table: sample_table.to_string(),
        state,
    };
    JsonOutput::print_run(&summary).into_diagnostic()?;
    Ok(())
}
