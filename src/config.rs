use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::{DependencyEmbedding, ExecutionMode, is_valid_label};
use crate::error::ZarpError;
use crate::fs_util;
use crate::sample::SampleConfig;

pub const DEFAULT_CONFIG_FILE: &str = "zarp-samples.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub sample: SampleConfig,
    #[serde(default)]
    pub run: RunEntry,
}

/// Run parameters as written in the config file; unset values get defaults.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RunEntry {
    #[serde(default)]
    pub working_directory: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub cores: Option<u32>,
    #[serde(default)]
    pub execution_mode: Option<ExecutionMode>,
    #[serde(default)]
    pub dependency_embedding: Option<DependencyEmbedding>,
    #[serde(default)]
    pub snakefile: Option<String>,
    #[serde(default)]
    pub workflow_config: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub working_directory: Utf8PathBuf,
    pub identifier: String,
    pub cores: u32,
    pub execution_mode: ExecutionMode,
    pub dependency_embedding: DependencyEmbedding,
    pub snakefile: Utf8PathBuf,
    pub workflow_config: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub references: Vec<String>,
    pub sample: SampleConfig,
    pub run: RunConfig,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ZarpError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(ZarpError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ZarpError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ZarpError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, ZarpError> {
        let run = resolve_run(config.run)?;
        Ok(ResolvedConfig {
            references: config.references,
            sample: config.sample,
            run,
        })
    }
}

fn resolve_run(entry: RunEntry) -> Result<RunConfig, ZarpError> {
    let working_directory = match entry.working_directory {
        Some(dir) => fs_util::absolute(&fs_util::expand_home(&dir)),
        None => default_working_directory()?,
    };

    let identifier = entry
        .identifier
        .unwrap_or_else(|| fs_util::generate_id(fs_util::DEFAULT_ID_LENGTH));
    if !is_valid_label(&identifier) {
        return Err(ZarpError::ConfigParse(format!(
            "invalid run identifier '{identifier}'"
        )));
    }

    let cores = entry.cores.unwrap_or(1);
    if cores == 0 {
        return Err(ZarpError::ConfigParse(
            "run cores must be at least 1".to_string(),
        ));
    }

    let snakefile = entry.snakefile.as_deref().unwrap_or("Snakefile");
    Ok(RunConfig {
        working_directory,
        identifier,
        cores,
        execution_mode: entry.execution_mode.unwrap_or_default(),
        dependency_embedding: entry.dependency_embedding.unwrap_or_default(),
        snakefile: fs_util::absolute(&fs_util::expand_home(snakefile)),
        workflow_config: entry
            .workflow_config
            .map(|path| fs_util::absolute(&fs_util::expand_home(&path))),
    })
}

/// `~/.zarp`
pub fn default_working_directory() -> Result<Utf8PathBuf, ZarpError> {
    let base = BaseDirs::new()
        .ok_or_else(|| ZarpError::Filesystem("unable to determine home dir".to_string()))?;
    let home = Utf8PathBuf::from_path_buf(base.home_dir().to_path_buf())
        .map_err(|_| ZarpError::Filesystem("home dir is not valid UTF-8".to_string()))?;
    Ok(home.join(".zarp"))
}
