//! The stylesheet block injected into every page.
//!
//! The default is the GitHub markdown stylesheet, embedded at compile time
//! from `static/github-markdown.html`. A file can replace it; loading happens
//! once, before any task starts, and a failure aborts the run.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const GITHUB_MARKDOWN_STYLE: &str = include_str!("../static/github-markdown.html");

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Cannot load stylesheet {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Immutable stylesheet bytes shared by every task of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleAsset {
    bytes: Vec<u8>,
}

impl StyleAsset {
    /// The built-in GitHub markdown stylesheet.
    pub fn embedded() -> Self {
        Self {
            bytes: GITHUB_MARKDOWN_STYLE.as_bytes().to_vec(),
        }
    }

    /// Use `bytes` exactly as given.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Load a stylesheet file.
    ///
    /// Files that already hold markup (`<style>…`, `<link …>`) are used as is;
    /// plain CSS is wrapped in a `<style>` element.
    pub fn from_file(path: &Path) -> Result<Self, AssetError> {
        let content = fs::read(path).map_err(|source| AssetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_markup = content
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|&b| b == b'<');
        let bytes = if is_markup {
            content
        } else {
            [b"<style>\n".as_slice(), &content, b"\n</style>\n"].concat()
        };
        Ok(Self { bytes })
    }

    /// The override at `path` when given, the embedded stylesheet otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, AssetError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::embedded()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
