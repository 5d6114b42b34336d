use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ZarpError;

static ACCESSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[DES]RR\d{7,}$").expect("accession pattern is valid"));

static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-_.]+$").expect("label pattern is valid"));

/// Returns whether `label` is usable as a sample name prefix (`label@...`).
pub fn is_valid_label(label: &str) -> bool {
    LABEL_RE.is_match(label)
}

/// Read archive run accession (DDBJ, ENA or SRA), always upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = ZarpError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.to_uppercase();
        if !ACCESSION_RE.is_match(&normalized) {
            return Err(ZarpError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceKind {
    LocalSingle,
    LocalPaired,
    RemoteAccession,
    Table,
    Invalid,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::LocalSingle => "LOCAL_SINGLE",
            ReferenceKind::LocalPaired => "LOCAL_PAIRED",
            ReferenceKind::RemoteAccession => "REMOTE_ACCESSION",
            ReferenceKind::Table => "TABLE",
            ReferenceKind::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceKind {
    type Err = ZarpError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "LOCAL_SINGLE" => Ok(ReferenceKind::LocalSingle),
            "LOCAL_PAIRED" => Ok(ReferenceKind::LocalPaired),
            "REMOTE_ACCESSION" => Ok(ReferenceKind::RemoteAccession),
            "TABLE" => Ok(ReferenceKind::Table),
            "INVALID" => Ok(ReferenceKind::Invalid),
            _ => Err(ZarpError::InvalidReferenceKind(value.to_string())),
        }
    }
}

/// Read file(s) of a local library; `second` is set for paired-end libraries only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryPaths {
    pub first: Utf8PathBuf,
    pub second: Option<Utf8PathBuf>,
}

impl LibraryPaths {
    pub fn single(first: Utf8PathBuf) -> Self {
        Self {
            first,
            second: None,
        }
    }

    pub fn paired(first: Utf8PathBuf, second: Utf8PathBuf) -> Self {
        Self {
            first,
            second: Some(second),
        }
    }

    pub fn is_paired(&self) -> bool {
        self.second.is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utf8Path> {
        std::iter::once(self.first.as_path()).chain(self.second.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    Library(LibraryPaths),
    Remote(Accession),
    Table(Utf8PathBuf),
    Invalid,
}

/// Outcome of classifying one user-supplied sample reference.
///
/// The payload is a tagged union, so a reference never carries more than one
/// of library paths, accession or table path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleReference {
    pub raw: String,
    pub name: Option<String>,
    pub target: ReferenceTarget,
}

impl SampleReference {
    pub fn invalid(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            name: None,
            target: ReferenceTarget::Invalid,
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        match &self.target {
            ReferenceTarget::Library(paths) if paths.is_paired() => ReferenceKind::LocalPaired,
            ReferenceTarget::Library(_) => ReferenceKind::LocalSingle,
            ReferenceTarget::Remote(_) => ReferenceKind::RemoteAccession,
            ReferenceTarget::Table(_) => ReferenceKind::Table,
            ReferenceTarget::Invalid => ReferenceKind::Invalid,
        }
    }

    pub fn lib_paths(&self) -> Option<&LibraryPaths> {
        match &self.target {
            ReferenceTarget::Library(paths) => Some(paths),
            _ => None,
        }
    }

    pub fn identifier(&self) -> Option<&Accession> {
        match &self.target {
            ReferenceTarget::Remote(accession) => Some(accession),
            _ => None,
        }
    }

    pub fn table_path(&self) -> Option<&Utf8Path> {
        match &self.target {
            ReferenceTarget::Table(path) => Some(path),
            _ => None,
        }
    }
}

/// Library type in Salmon notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ReadOrientation {
    #[serde(rename = "SF")]
    #[value(name = "SF")]
    StrandedForward,
    #[serde(rename = "SR")]
    #[value(name = "SR")]
    StrandedReverse,
    #[serde(rename = "U")]
    #[value(name = "U")]
    Unstranded,
    #[serde(rename = "ISF")]
    #[value(name = "ISF")]
    InwardStrandedForward,
    #[serde(rename = "ISR")]
    #[value(name = "ISR")]
    InwardStrandedReverse,
    #[serde(rename = "IU")]
    #[value(name = "IU")]
    InwardUnstranded,
}

impl fmt::Display for ReadOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadOrientation::StrandedForward => write!(f, "SF"),
            ReadOrientation::StrandedReverse => write!(f, "SR"),
            ReadOrientation::Unstranded => write!(f, "U"),
            ReadOrientation::InwardStrandedForward => write!(f, "ISF"),
            ReadOrientation::InwardStrandedReverse => write!(f, "ISR"),
            ReadOrientation::InwardUnstranded => write!(f, "IU"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    DryRun,
    PrepareRun,
    #[default]
    Run,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyEmbedding {
    #[default]
    Conda,
    Singularity,
}
