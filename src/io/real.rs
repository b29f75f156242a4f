//! Disk-backed [`FileSystem`].

use super::traits::{is_source_file, FileSystem};
use crate::errors::{RelocationError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Delegates to `std::fs`.
#[derive(Debug, Default, Clone)]
pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFileSystem {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| RelocationError::read(path, e))
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| RelocationError::write(path, e))?;
        }
        fs::write(path, bytes).map_err(|e| RelocationError::write(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn source_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() > 0 => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
                Err(e) => {
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                    return Err(RelocationError::read(root, source));
                }
            };
            if entry.file_type().is_file() && is_source_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::encoding::{Encoding, TextFile};
    use tempfile::TempDir;

    #[test]
    fn finds_source_files_recursively() {
        let dir = TempDir::new().unwrap();
        let fs = RealFileSystem::new();
        fs.write_bytes(&dir.path().join("b/B.cs"), b"class B {}").unwrap();
        fs.write_bytes(&dir.path().join("A.cs"), b"class A {}").unwrap();
        fs.write_bytes(&dir.path().join("notes.txt"), b"").unwrap();

        let files = fs.source_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("A.cs"), dir.path().join("b/B.cs")]);
    }

    #[test]
    fn round_trips_encoding() {
        let dir = TempDir::new().unwrap();
        let fs = RealFileSystem::new();
        let path = dir.path().join("A.cs");
        fs.write_text(&path, &TextFile::new("class A {}", Encoding::Utf16Le)).unwrap();
        let file = fs.read_text(&path).unwrap();
        assert_eq!(file.encoding, Encoding::Utf16Le);
        assert_eq!(file.text, "class A {}");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = RealFileSystem::new()
            .read_bytes(Path::new("/definitely/not/here.cs"))
            .unwrap_err();
        assert_eq!(err.code(), crate::errors::ErrorCode::IO_READ);
    }
}
