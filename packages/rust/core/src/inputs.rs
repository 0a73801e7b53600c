//! Input path expansion for the export pipeline.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use cardfeed_shared::{CardfeedError, Result};

/// Expand paths, directories and glob patterns into note files.
///
/// - a directory contributes every `*.md` beneath it, recursively
/// - a pattern containing glob metacharacters contributes its sorted matches
/// - an existing file contributes itself
///
/// Duplicates (by canonical path) are dropped, first occurrence wins.
/// Resolving nothing at all is an error.
pub fn expand_inputs<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        for path in expand_one(input)? {
            let key = path.canonicalize().unwrap_or_else(|_| path.clone());
            if seen.insert(key) {
                out.push(path);
            }
        }
    }

    if out.is_empty() {
        return Err(CardfeedError::NoInputs);
    }

    debug!(count = out.len(), "inputs resolved");
    Ok(out)
}

fn expand_one(input: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(input);

    if path.is_dir() {
        let pattern = path.join("**").join("*.md");
        return glob_sorted(&pattern.to_string_lossy());
    }

    if is_glob(input) {
        return glob_sorted(input);
    }

    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    warn!(input, "input did not match any file");
    Ok(Vec::new())
}

fn is_glob(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

fn glob_sorted(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern)
        .map_err(|e| CardfeedError::validation(format!("invalid glob '{pattern}': {e}")))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "skipping unreadable glob match");
                None
            }
        })
        .filter(|p| p.is_file())
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, rel: &str) -> PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "x").unwrap();
        path
    }

    #[test]
    fn directory_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.md");
        touch(dir.path(), "a/z.md");
        touch(dir.path(), "a/notes.txt");

        let found = expand_inputs(&[dir.path().to_string_lossy()]).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("a/z.md"), PathBuf::from("b.md")]);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.md");
        touch(dir.path(), "b.md");

        let glob = dir.path().join("*.md").to_string_lossy().into_owned();
        let found = expand_inputs(&[a.to_string_lossy().into_owned(), glob]).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], a);
    }

    #[test]
    fn nothing_resolved_is_no_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.md").to_string_lossy().into_owned();
        let err = expand_inputs(&[missing]).unwrap_err();
        assert!(matches!(err, CardfeedError::NoInputs));
        assert!(err.is_input_error());
    }
}
