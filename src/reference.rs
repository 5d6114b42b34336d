//! Classification of user-supplied sample references.
//!
//! Supported syntax, in order of precedence:
//!
//! 1. `path/to/reads.fq.gz`
//! 2. `name@path/to/reads.fq.gz`
//! 3. `mate_1.fq.gz,mate_2.fq.gz`
//! 4. `name@mate_1.fq.gz,mate_2.fq.gz`
//! 5. `SRR1234567` (also `DRR`/`ERR`, any case)
//! 6. `name@SRR1234567`
//! 7. `table:path/to/samples.tsv`
//!
//! The first rule that matches wins; anything else is invalid.

use camino::Utf8PathBuf;
use tracing::debug;

use crate::domain::{Accession, LibraryPaths, ReferenceTarget, SampleReference, is_valid_label};
use crate::fs_util;

const TABLE_PREFIX: &str = "table";

pub fn classify(raw: &str) -> SampleReference {
    let (name, target) = if let Some(path) = unnamed_single_end(raw) {
        (None, ReferenceTarget::Library(LibraryPaths::single(path)))
    } else if let Some((name, path)) = named_single_end(raw) {
        (Some(name), ReferenceTarget::Library(LibraryPaths::single(path)))
    } else if let Some((first, second)) = unnamed_paired_end(raw) {
        (None, ReferenceTarget::Library(LibraryPaths::paired(first, second)))
    } else if let Some((name, (first, second))) = named_paired_end(raw) {
        (
            Some(name),
            ReferenceTarget::Library(LibraryPaths::paired(first, second)),
        )
    } else if let Some(accession) = unnamed_accession(raw) {
        (None, ReferenceTarget::Remote(accession))
    } else if let Some((name, accession)) = named_accession(raw) {
        (Some(name), ReferenceTarget::Remote(accession))
    } else if let Some(path) = sample_table(raw) {
        (None, ReferenceTarget::Table(path))
    } else {
        (None, ReferenceTarget::Invalid)
    };

    let reference = SampleReference {
        raw: raw.to_string(),
        name,
        target,
    };
    debug!(reference = raw, kind = %reference.kind(), "classified sample reference");
    reference
}

pub fn unnamed_single_end(raw: &str) -> Option<Utf8PathBuf> {
    existing_file(raw)
}

pub fn named_single_end(raw: &str) -> Option<(String, Utf8PathBuf)> {
    let (label, rest) = split_label(raw)?;
    Some((label, existing_file(rest)?))
}

pub fn unnamed_paired_end(raw: &str) -> Option<(Utf8PathBuf, Utf8PathBuf)> {
    let parts = raw.split(',').collect::<Vec<_>>();
    match parts.as_slice() {
        [first, second] => Some((existing_file(first)?, existing_file(second)?)),
        _ => None,
    }
}

pub fn named_paired_end(raw: &str) -> Option<(String, (Utf8PathBuf, Utf8PathBuf))> {
    let (label, rest) = split_label(raw)?;
    Some((label, unnamed_paired_end(rest)?))
}

pub fn unnamed_accession(raw: &str) -> Option<Accession> {
    raw.parse().ok()
}

pub fn named_accession(raw: &str) -> Option<(String, Accession)> {
    let (label, rest) = split_label(raw)?;
    Some((label, rest.parse().ok()?))
}

pub fn sample_table(raw: &str) -> Option<Utf8PathBuf> {
    let (prefix, rest) = raw.split_once(':')?;
    if prefix != TABLE_PREFIX {
        return None;
    }
    existing_file(rest)
}

fn split_label(raw: &str) -> Option<(String, &str)> {
    let (label, rest) = raw.split_once('@')?;
    is_valid_label(label).then(|| (label.to_string(), rest))
}

fn existing_file(raw: &str) -> Option<Utf8PathBuf> {
    if !fs_util::is_file(raw) {
        return None;
    }
    Some(fs_util::absolute(&fs_util::expand_home(raw)))
}
