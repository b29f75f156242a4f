//! Parsed documents of the loaded program.
//!
//! The workspace caches one [`Document`] per normalized path. A program load
//! replaces the cache wholesale; in single-file mode documents are parsed on
//! demand and the index only sees what has been touched.

pub mod index;
pub mod paths;

pub use index::{TypeIndex, UnitIndex};
pub use paths::normalize_path;

use crate::errors::{RelocationError, Result};
use crate::io::{Encoding, FileSystem, TextFile};
use crate::syntax::{parse_compilation_unit, CompilationUnit};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, debug_span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub unit: CompilationUnit,
    pub encoding: Encoding,
}

impl Document {
    pub fn read(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let TextFile { text, encoding } = fs.read_text(path)?;
        let unit = parse_compilation_unit(&text).map_err(|e| RelocationError::parse(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            unit,
            encoding,
        })
    }

    pub fn text_file(&self) -> TextFile {
        TextFile::new(self.unit.to_source(), self.encoding)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    documents: BTreeMap<PathBuf, Document>,
    program_loaded: bool,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every file of a program, replacing whatever was cached.
    /// Nothing is replaced if any file fails to read or parse.
    pub fn load(&mut self, fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<()> {
        let _span = debug_span!("load_program", files = paths.len()).entered();
        let mut documents = BTreeMap::new();
        for path in paths {
            let path = normalize_path(path);
            let document = Document::read(fs, &path)?;
            documents.insert(path, document);
        }
        debug!(documents = documents.len(), "Program loaded");
        self.documents = documents;
        self.program_loaded = true;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.program_loaded = false;
    }

    pub fn is_program_loaded(&self) -> bool {
        self.program_loaded
    }

    pub fn get(&self, path: &Path) -> Option<&Document> {
        self.documents.get(&normalize_path(path))
    }

    /// The cached document, reading and parsing it on first use.
    pub fn get_or_load(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<Document> {
        let path = normalize_path(path);
        if let Some(document) = self.documents.get(&path) {
            return Ok(document.clone());
        }
        let document = Document::read(fs, &path)?;
        self.documents.insert(path, document.clone());
        Ok(document)
    }

    pub fn insert(&mut self, document: Document) {
        let path = normalize_path(&document.path);
        self.documents.insert(path.clone(), Document { path, ..document });
    }

    /// First document (in path order) declaring a type named `name`.
    pub fn find_type_file(&self, name: &str) -> Option<PathBuf> {
        self.documents
            .values()
            .find(|doc| doc.unit.find_type(name).is_some())
            .map(|doc| doc.path.clone())
    }

    /// Documents other than `path` declaring a type named `name`.
    pub fn files_declaring(&self, name: &str, except: &Path) -> Vec<PathBuf> {
        let except = normalize_path(except);
        self.documents
            .values()
            .filter(|doc| doc.path != except && doc.unit.find_type(name).is_some())
            .map(|doc| doc.path.clone())
            .collect()
    }

    pub fn units(&self) -> impl Iterator<Item = &CompilationUnit> {
        self.documents.values().map(|doc| &doc.unit)
    }

    /// Cached units other than the ones at `paths`.
    pub fn units_except<'a>(&'a self, paths: &'a [PathBuf]) -> impl Iterator<Item = &'a CompilationUnit> {
        self.documents
            .iter()
            .filter(move |(path, _)| !paths.contains(path))
            .map(|(_, doc)| &doc.unit)
    }

    pub fn index(&self) -> UnitIndex<'_> {
        UnitIndex::new(self.units())
    }
}
