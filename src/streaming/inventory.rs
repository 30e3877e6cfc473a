//! The table of local files the server is allowed to hand out.
//!
//! Built once before the listener is bound and never mutated afterwards, so
//! request handlers share it through an `Arc` without any locking.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A local file that can be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub local_path: PathBuf,
    pub size: u64,
    pub content_type: String,
}

impl FileEntry {
    /// Stat `path` once and record its size.
    pub fn stat(path: impl AsRef<Path>, content_type: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::file_not_found(path),
            _ => Error::Io(e),
        })?;

        if !metadata.is_file() {
            return Err(Error::InvalidInput(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        Ok(Self {
            local_path: path.to_path_buf(),
            size: metadata.len(),
            content_type: content_type.into(),
        })
    }
}

/// Mapping from URL path to served file.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    files: HashMap<String, FileEntry>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry` under `url_path`. A later insert for the same path
    /// replaces the earlier one.
    pub fn insert(&mut self, url_path: impl Into<String>, entry: FileEntry) {
        self.files.insert(url_path.into(), entry);
    }

    /// Exact-match lookup. No normalization or trailing-slash handling.
    pub fn resolve(&self, url_path: &str) -> Option<&FileEntry> {
        self.files.get(url_path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl FromIterator<(String, FileEntry)> for Inventory {
    fn from_iter<I: IntoIterator<Item = (String, FileEntry)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}
