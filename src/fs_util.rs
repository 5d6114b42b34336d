use std::fs;
use std::io::Write;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use rand::Rng;
use tempfile::Builder;

use crate::error::ZarpError;

const ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default length of identifiers produced by [`generate_id`].
pub const DEFAULT_ID_LENGTH: usize = 6;

/// Expands a leading `~` to the current user's home directory.
pub fn expand_home(raw: &str) -> Utf8PathBuf {
    let rest = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return Utf8PathBuf::from(raw),
    };
    let home = BaseDirs::new()
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.home_dir().to_path_buf()).ok());
    match home {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => Utf8PathBuf::from(raw),
    }
}

/// Lexically removes `.` components and folds `..` into their parent.
///
/// Symlinks are not followed, so the result may differ from a canonical path.
pub fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_str()),
        }
    }
    out
}

/// Makes `path` absolute against the current working directory.
pub fn absolute(path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        return normalize(path);
    }
    let cwd = std::env::current_dir()
        .ok()
        .and_then(|cwd| Utf8PathBuf::from_path_buf(cwd).ok());
    match cwd {
        Some(cwd) => normalize(&cwd.join(path)),
        None => normalize(path),
    }
}

/// Resolves `path` relative to `anchor`. Absolute paths are returned as is.
pub fn resolve_path(anchor: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    absolute(&anchor.join(path))
}

/// Expands `~` and checks whether the reference points to a regular file.
pub fn is_file(raw: &str) -> bool {
    !raw.is_empty() && expand_home(raw).as_std_path().is_file()
}

/// Replaces spaces with underscores and lower-cases the value.
pub fn sanitize_string(value: &str) -> String {
    value.replace(' ', "_").to_lowercase()
}

/// Generates a random identifier of upper-case ASCII letters and digits.
pub fn generate_id(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| ID_CHARSET[rng.random_range(0..ID_CHARSET.len())] as char)
        .collect()
}

/// Writes `content` to a temporary sibling of `path` and moves it into place.
pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ZarpError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ZarpError::Filesystem(format!("create {parent}: {err}")))?;
    let mut temp = Builder::new()
        .prefix(".zarp-samples")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ZarpError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| ZarpError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| ZarpError::Filesystem(format!("persist {path}: {err}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_parent_components() {
        let path = normalize(Utf8Path::new("/data/run/../reads/./a.fq"));
        assert_eq!(path, Utf8PathBuf::from("/data/reads/a.fq"));
    }

    #[test]
    fn resolve_path_keeps_absolute() {
        let anchor = Utf8Path::new("/anchor");
        assert_eq!(
            resolve_path(anchor, Utf8Path::new("/abs/a.fq")),
            Utf8PathBuf::from("/abs/a.fq")
        );
        assert_eq!(
            resolve_path(anchor, Utf8Path::new("reads/a.fq")),
            Utf8PathBuf::from("/anchor/reads/a.fq")
        );
    }

    #[test]
    fn sanitize_replaces_spaces() {
        assert_eq!(sanitize_string("Homo Sapiens"), "homo_sapiens");
    }

    #[test]
    fn generated_ids_use_charset() {
        let id = generate_id(DEFAULT_ID_LENGTH);
        assert_eq!(id.len(), 6);
        assert!(id.bytes().all(|byte| ID_CHARSET.contains(&byte)));
    }

    #[test]
    fn tilde_in_middle_is_literal() {
        assert_eq!(expand_home("a~b"), Utf8PathBuf::from("a~b"));
        assert_eq!(expand_home("~user/x"), Utf8PathBuf::from("~user/x"));
    }
}
