//! In-memory [`FileSystem`] for tests and dry runs.

use super::traits::{is_source_file, FileSystem};
use crate::errors::{RelocationError, Result};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Files keyed by path. Paths are used as given; callers normalize them.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    /// Writes still allowed before a path starts refusing them.
    failing_writes: RwLock<BTreeMap<PathBuf, usize>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.into(), bytes.into());
    }

    pub fn insert_text(&self, path: impl Into<PathBuf>, text: &str) {
        self.insert(path, text.as_bytes().to_vec());
    }

    /// The file as UTF-8 text, if present and valid.
    pub fn text(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path.as_ref())
            .and_then(|bytes| String::from_utf8(bytes.clone()).ok())
    }

    /// Makes every later write to `path` fail with a permission error.
    pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
        self.fail_writes_after(path, 0);
    }

    /// Lets `allowed` writes to `path` through, then fails the rest.
    pub fn fail_writes_after(&self, path: impl Into<PathBuf>, allowed: usize) {
        self.failing_writes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.into(), allowed);
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
            .ok_or_else(|| {
                RelocationError::read(path, io::Error::new(io::ErrorKind::NotFound, "no such file"))
            })
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let failing = match self
            .failing_writes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(path)
        {
            Some(0) => true,
            Some(allowed) => {
                *allowed -= 1;
                false
            }
            None => false,
        };
        if failing {
            return Err(RelocationError::write(
                path,
                io::Error::new(io::ErrorKind::PermissionDenied, "write refused"),
            ));
        }
        self.insert(path, bytes.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .any(|p| p == path || p.starts_with(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(path)
    }

    fn source_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        Ok(self
            .files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .filter(|p| p.starts_with(root) && is_source_file(p))
            .cloned()
            .collect())
    }
}
