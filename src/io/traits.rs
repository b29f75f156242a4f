//! File system abstraction.
//!
//! The engine never touches `std::fs` directly. Everything goes through
//! [`FileSystem`], so moves can run against an in-memory tree in tests and
//! against the real disk otherwise.

use super::encoding::TextFile;
use crate::errors::{RelocationError, Result};
use std::path::{Path, PathBuf};

/// Whole-file reads and writes.
///
/// Implementations must be `Send + Sync`; an engine may be shared behind an
/// `Arc` even though moves themselves run sequentially.
pub trait FileSystem: Send + Sync {
    /// Read a file's raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an I/O error (R030) if the file is missing or unreadable.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>>;

    /// Replace a file's contents, creating it and its parent directories.
    ///
    /// # Errors
    ///
    /// Returns an I/O error (R031) if the write fails.
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    /// All `*.cs` files below `root`, sorted.
    fn source_files(&self, root: &Path) -> Result<Vec<PathBuf>>;

    /// Read and decode a text file, remembering its encoding.
    fn read_text(&self, path: &Path) -> Result<TextFile> {
        let bytes = self.read_bytes(path)?;
        TextFile::decode(&bytes).map_err(|e| {
            RelocationError::read(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    fn write_text(&self, path: &Path, file: &TextFile) -> Result<()> {
        self.write_bytes(path, &file.encode())
    }
}

pub(crate) fn is_source_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("cs"))
}
