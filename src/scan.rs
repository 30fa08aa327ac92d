//! Source discovery.
//!
//! Lists the markdown files of a single directory (no recursion) into a
//! [`FileManifest`]. Only regular files whose names end in a recognized
//! suffix are kept; names are sorted so that the menu and the run summary
//! come out the same on every platform.
//!
//! ```text
//! docs/
//! ├── guide.markdown   ✓
//! ├── intro.md         ✓
//! ├── notes.txt        ✗ (unrecognized suffix)
//! ├── drafts/          ✗ (directory)
//! └── old.md.bak       ✗ (suffix must be trailing)
//! ```

use crate::naming;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read source directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Not a markdown file: {0}")]
    NotMarkdown(PathBuf),
    #[error("Source file not found: {0}")]
    NotFound(PathBuf),
}

/// Ordered names of the source files for one run.
///
/// Built once by the driver and shared read-only by every task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileManifest {
    root: PathBuf,
    files: Vec<String>,
}

impl FileManifest {
    pub fn new(root: impl Into<PathBuf>, files: Vec<String>) -> Self {
        Self {
            root: root.into(),
            files,
        }
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Full path of a source file.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

/// List the recognized markdown files directly inside `root`.
pub fn scan<S: AsRef<str>>(root: &Path, extensions: &[S]) -> Result<FileManifest, ScanError> {
    let read_dir_err = |source| ScanError::ReadDir {
        path: root.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(root).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            debug!(path = %path.display(), "skipping non UTF-8 file name");
            continue;
        };
        if naming::is_recognized(&name, extensions) {
            files.push(name);
        }
    }
    files.sort();

    debug!(root = %root.display(), count = files.len(), "scanned source directory");
    Ok(FileManifest::new(root, files))
}

/// Manifest holding just one file, for converting a single document.
pub fn single_file<S: AsRef<str>>(
    path: &Path,
    extensions: &[S],
) -> Result<FileManifest, ScanError> {
    if !path.is_file() {
        return Err(ScanError::NotFound(path.to_path_buf()));
    }
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| naming::is_recognized(n, extensions))
        .ok_or_else(|| ScanError::NotMarkdown(path.to_path_buf()))?;
    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    Ok(FileManifest::new(root, vec![name.to_string()]))
}
