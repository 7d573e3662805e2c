//! Compare-or-update harness for generated files.
//!
//! Generated code is checked in. A test regenerates it into a scratch
//! directory and compares against the checked-in copy: the set of files and
//! every byte must match. With [`UpdateMode::Overwrite`] the checked-in copy
//! is replaced instead, including removal of files that are no longer
//! generated. The mode is an explicit argument; there is no global switch.

use log::debug;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// What to do when generated output differs from the expected copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// Fail with a description of the difference.
    #[default]
    Compare,
    /// Make the expected copy match the generated output.
    Overwrite,
}

impl UpdateMode {
    pub fn from_flag(update: bool) -> Self {
        if update {
            UpdateMode::Overwrite
        } else {
            UpdateMode::Compare
        }
    }
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error(
        "generated files differ from `{}`: only generated {only_actual:?}, only expected {only_expected:?} (update to accept)",
        .expected.display()
    )]
    FileSetMismatch {
        expected: PathBuf,
        only_actual: Vec<PathBuf>,
        only_expected: Vec<PathBuf>,
    },
    #[error("`{}` does not match generated output (update to accept):\n{diff}", .path.display())]
    ContentMismatch { path: PathBuf, diff: String },
    #[error("i/o error at `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> SnapshotError + '_ {
    move |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Line diff of `expected` against `actual`, with three lines of context
/// around each change.
pub fn unified_diff(expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let mut output = String::new();
    for (i, group) in diff.grouped_ops(3).iter().enumerate() {
        if i > 0 {
            output.push_str("...\n");
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let prefix = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                output.push(prefix);
                output.push_str(change.value());
                if change.missing_newline() {
                    output.push('\n');
                }
            }
        }
    }
    output
}

/// Files under `dir`, relative to it, sorted. A missing directory is empty.
pub fn files_in_dir(dir: &Path) -> SnapshotResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|err| SnapshotError::Io {
            path: err.path().unwrap_or(dir).to_path_buf(),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(dir) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

/// Compare `data` with the file at `path`, or write it there.
pub fn compare_or_update_file(path: &Path, data: &str, mode: UpdateMode) -> SnapshotResult<()> {
    match mode {
        UpdateMode::Overwrite => {
            debug!("Updating data at: {}", path.display());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(io_error(parent))?;
            }
            fs::write(path, data).map_err(io_error(path))
        }
        UpdateMode::Compare => {
            debug!("Comparing data at: {}", path.display());
            let expected = fs::read_to_string(path).map_err(io_error(path))?;
            if expected == data {
                Ok(())
            } else {
                Err(SnapshotError::ContentMismatch {
                    path: path.to_path_buf(),
                    diff: unified_diff(&expected, data),
                })
            }
        }
    }
}

/// Compare the tree at `actual` with the tree at `expected`, or make
/// `expected` a copy of `actual`.
pub fn compare_or_update_dir(actual: &Path, expected: &Path, mode: UpdateMode) -> SnapshotResult<()> {
    let actual_files = files_in_dir(actual)?;
    let expected_files = files_in_dir(expected)?;

    match mode {
        UpdateMode::Overwrite => {
            debug!("Updating data at: {}", expected.display());
            for stale in expected_files.iter().filter(|f| !actual_files.contains(f)) {
                let path = expected.join(stale);
                fs::remove_file(&path).map_err(io_error(&path))?;
            }
            for file in &actual_files {
                let target = expected.join(file);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(io_error(parent))?;
                }
                let source = actual.join(file);
                fs::copy(&source, &target).map_err(io_error(&source))?;
            }
            Ok(())
        }
        UpdateMode::Compare => {
            debug!("Comparing data at: {}", expected.display());
            let only_actual: Vec<PathBuf> = actual_files
                .iter()
                .filter(|f| !expected_files.contains(f))
                .cloned()
                .collect();
            let only_expected: Vec<PathBuf> = expected_files
                .iter()
                .filter(|f| !actual_files.contains(f))
                .cloned()
                .collect();
            if !only_actual.is_empty() || !only_expected.is_empty() {
                return Err(SnapshotError::FileSetMismatch {
                    expected: expected.to_path_buf(),
                    only_actual,
                    only_expected,
                });
            }

            for file in &actual_files {
                let actual_path = actual.join(file);
                let expected_path = expected.join(file);
                let generated = fs::read(&actual_path).map_err(io_error(&actual_path))?;
                let checked_in = fs::read(&expected_path).map_err(io_error(&expected_path))?;
                if generated != checked_in {
                    return Err(SnapshotError::ContentMismatch {
                        diff: unified_diff(
                            &String::from_utf8_lossy(&checked_in),
                            &String::from_utf8_lossy(&generated),
                        ),
                        path: expected_path,
                    });
                }
            }
            Ok(())
        }
    }
}
