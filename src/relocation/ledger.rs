//! Methods moved during the current session.

use crate::workspace::normalize_path;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// `(normalized source path, method name)` pairs. A method in the ledger has
/// already been replaced by a stub; moving it again would move the stub.
#[derive(Debug, Clone, Default)]
pub struct MoveLedger {
    moved: BTreeSet<(PathBuf, String)>,
}

impl MoveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path, method: &str) -> bool {
        self.moved
            .contains(&(normalize_path(path), method.to_string()))
    }

    /// Returns false when the entry was already present.
    pub fn record(&mut self, path: &Path, method: &str) -> bool {
        self.moved.insert((normalize_path(path), method.to_string()))
    }

    pub fn reset(&mut self) {
        self.moved.clear();
    }

    pub fn len(&self) -> usize {
        self.moved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moved.is_empty()
    }
}
