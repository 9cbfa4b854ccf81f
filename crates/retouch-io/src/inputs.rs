//! Input discovery and validation.

use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::formats::{InputKind, lowercase_extension};
use crate::job::JobError;

/// Every supported file under `dir`, sorted by path.
///
/// Without `recursive` only the directory's own entries are considered.
/// Hidden entries (names starting with `.`) are skipped.
///
/// # Errors
///
/// Returns [`JobError::InputDirNotFound`] if `dir` is not a directory,
/// [`JobError::Scan`] if traversal fails and
/// [`JobError::NoSupportedInputs`] if nothing supported was found.
pub fn collect_inputs(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, JobError> {
    if !dir.is_dir() {
        return Err(JobError::InputDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && InputKind::of(entry.path()).is_supported() {
            found.push(entry.into_path());
        }
    }

    if found.is_empty() {
        return Err(JobError::NoSupportedInputs {
            path: dir.to_path_buf(),
        });
    }
    found.sort();
    Ok(found)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// An input rejected by [`validate_inputs`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidInput {
    /// The rejected path.
    pub path: PathBuf,
    /// Why it was rejected.
    pub reason: String,
}

/// Result of checking a list of inputs before a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputValidation {
    /// Existing files with a supported extension.
    pub valid: Vec<PathBuf>,
    /// The subset of `valid` that needs container decoding.
    pub container: Vec<PathBuf>,
    /// Everything else.
    pub invalid: Vec<InvalidInput>,
    /// Combined size of all existing inputs, in bytes.
    pub total_bytes: u64,
}

/// Classify `paths` without processing them.
#[must_use]
pub fn validate_inputs(paths: &[PathBuf]) -> InputValidation {
    let mut validation = InputValidation::default();
    for path in paths {
        let invalid = |reason: String| InvalidInput {
            path: path.clone(),
            reason,
        };
        let metadata = match std::fs::metadata(path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => {
                validation.invalid.push(invalid("not a file".to_owned()));
                continue;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                validation.invalid.push(invalid("not found".to_owned()));
                continue;
            }
            Err(e) => {
                validation.invalid.push(invalid(e.to_string()));
                continue;
            }
        };
        validation.total_bytes += metadata.len();

        match InputKind::of(path) {
            InputKind::Raster => validation.valid.push(path.clone()),
            InputKind::Container => {
                validation.container.push(path.clone());
                validation.valid.push(path.clone());
            }
            InputKind::Unsupported => {
                let ext = lowercase_extension(path).unwrap_or_default();
                validation
                    .invalid
                    .push(invalid(format!("unsupported format: .{ext}")));
            }
        }
    }
    validation
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(path: &Path, bytes: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn collects_supported_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.JPG"), b"x");
        touch(&dir.path().join("a.heic"), b"x");
        touch(&dir.path().join("notes.txt"), b"x");
        touch(&dir.path().join("sub/c.png"), b"x");

        let flat = collect_inputs(dir.path(), false).unwrap();
        assert_eq!(
            flat,
            vec![dir.path().join("a.heic"), dir.path().join("b.JPG")]
        );

        let deep = collect_inputs(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
        assert!(deep.contains(&dir.path().join("sub/c.png")));
    }

    #[test]
    fn hidden_entries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(".cache/x.jpg"), b"x");
        touch(&dir.path().join(".y.jpg"), b"x");
        touch(&dir.path().join("z.bmp"), b"x");
        let found = collect_inputs(dir.path(), true).unwrap();
        assert_eq!(found, vec![dir.path().join("z.bmp")]);
    }

    #[test]
    fn missing_or_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_inputs(&dir.path().join("nope"), true).unwrap_err();
        assert!(matches!(err, JobError::InputDirNotFound { .. }));

        touch(&dir.path().join("readme.md"), b"x");
        let err = collect_inputs(dir.path(), true).unwrap_err();
        assert!(matches!(err, JobError::NoSupportedInputs { .. }));
    }

    #[test]
    fn validation_sorts_inputs_into_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let jpg = dir.path().join("a.jpg");
        let heic = dir.path().join("b.HEIF");
        let txt = dir.path().join("c.txt");
        touch(&jpg, b"12345");
        touch(&heic, b"123");
        touch(&txt, b"1");
        let missing = dir.path().join("gone.png");

        let v = validate_inputs(&[jpg.clone(), heic.clone(), txt.clone(), missing.clone()]);
        assert_eq!(v.valid, vec![jpg, heic.clone()]);
        assert_eq!(v.container, vec![heic]);
        assert_eq!(v.total_bytes, 9);
        assert_eq!(
            v.invalid,
            vec![
                InvalidInput {
                    path: txt,
                    reason: "unsupported format: .txt".into()
                },
                InvalidInput {
                    path: missing,
                    reason: "not found".into()
                },
            ]
        );
    }
}
