use std::path::PathBuf;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ZarpError {
    #[error("invalid read archive accession: {0}")]
    InvalidAccession(String),

    #[error("invalid sample reference type: {0}")]
    InvalidReferenceKind(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("invalid column mapping: {0}")]
    InvalidMapping(String),

    #[error("failed to read sample table at {path}: {message}")]
    TableRead { path: Utf8PathBuf, message: String },

    #[error("failed to write sample table at {path}: {message}")]
    TableWrite { path: Utf8PathBuf, message: String },

    #[error("malformed sample table: {0}")]
    TableParse(String),

    #[error(
        "records and table have different lengths (expected {expected} rows, got {actual}); cannot update records"
    )]
    LengthMismatch { expected: usize, actual: usize },

    #[error("column '{0}' not found in records or table; cannot update records")]
    MissingColumn(String),

    #[error("value '{key}' occurs more than once in merge column '{column}'")]
    DuplicateKey { column: String, key: String },

    #[error("missing config file zarp-samples.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("sample processor '{name}' failed: {message}")]
    Processor { name: String, message: String },

    #[error("workflow command failed with {status}: {command}")]
    WorkflowFailed { command: String, status: String },
}
