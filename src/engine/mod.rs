//! Session-level entry point.
//!
//! An [`Engine`] owns the file system, configuration and the session: the
//! parsed workspace and the ledger of moved methods. Loading a program or
//! resetting the session clears both.
//!
//! # Example
//!
//! ```rust
//! use relocator::config::RelocatorConfig;
//! use relocator::engine::{Engine, MoveMethodsRequest};
//! use relocator::io::MemoryFileSystem;
//! use std::sync::Arc;
//!
//! let fs = Arc::new(MemoryFileSystem::new());
//! fs.insert_text(
//!     "/src/A.cs",
//!     "class A\n{\n    private int Val = 1;\n\n    public int Add(int x)\n    {\n        return x + Val;\n    }\n}\n",
//! );
//! let mut engine = Engine::new(fs.clone(), RelocatorConfig::default());
//! let report = engine
//!     .move_methods(&MoveMethodsRequest::new("/src/A.cs", "A", ["Add"], "B"))
//!     .unwrap();
//! assert!(report.summary().contains("Add was made static"));
//! assert!(fs.text("/src/B.cs").unwrap().contains("public static int Add(int val, int x)"));
//! ```

mod batch;
mod report;

pub use report::{MoveReport, MovedMethod};

use crate::config::{load_config, RelocatorConfig};
use crate::errors::Result;
use crate::io::FileSystem;
use crate::relocation::{AccessMemberKind, MoveLedger};
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Moves one or more methods of a source type to a target type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveMethodsRequest {
    pub file_path: PathBuf,
    pub source_type: String,
    pub method_names: Vec<String>,
    pub target_type: String,
    /// Defaults to the file declaring the target, or `<Target>.cs` next to
    /// the source file.
    #[serde(default)]
    pub target_file_path: Option<PathBuf>,
    #[serde(default)]
    pub constructor_injections: BTreeSet<String>,
    #[serde(default)]
    pub parameter_injections: BTreeSet<String>,
    #[serde(default)]
    pub access_member_name: Option<String>,
    /// Falls back to the configured default.
    #[serde(default)]
    pub access_member_kind: Option<AccessMemberKind>,
}

impl MoveMethodsRequest {
    pub fn new<I, S>(
        file_path: impl Into<PathBuf>,
        source_type: impl Into<String>,
        method_names: I,
        target_type: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            file_path: file_path.into(),
            source_type: source_type.into(),
            method_names: method_names.into_iter().map(Into::into).collect(),
            target_type: target_type.into(),
            target_file_path: None,
            constructor_injections: BTreeSet::new(),
            parameter_injections: BTreeSet::new(),
            access_member_name: None,
            access_member_kind: None,
        }
    }

    pub fn with_target_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_file_path = Some(path.into());
        self
    }

    pub fn with_constructor_injections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constructor_injections = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parameter_injections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_injections = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_access_member(mut self, name: impl Into<String>, kind: AccessMemberKind) -> Self {
        self.access_member_name = Some(name.into());
        self.access_member_kind = Some(kind);
        self
    }
}

/// State that lives until the program is reloaded.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub ledger: MoveLedger,
    pub workspace: Workspace,
}

pub struct Engine {
    fs: Arc<dyn FileSystem>,
    config: RelocatorConfig,
    session: Session,
    cancel: Arc<AtomicBool>,
}

impl Engine {
    pub fn new(fs: Arc<dyn FileSystem>, config: RelocatorConfig) -> Self {
        Self {
            fs,
            config,
            session: Session::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// An engine configured from the `.relocator.toml` nearest to `start`.
    pub fn discover(fs: Arc<dyn FileSystem>, start: &Path) -> Self {
        let config = load_config(fs.as_ref(), start);
        Self::new(fs, config)
    }

    pub fn config(&self) -> &RelocatorConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Parses a whole program. Call resolution in later batches then goes
    /// through declarations instead of names.
    pub fn load_program(&mut self, paths: &[PathBuf]) -> Result<()> {
        self.reset_session();
        self.session.workspace.load(self.fs.as_ref(), paths)
    }

    /// Loads every `*.cs` file below `root`. Returns the number of files.
    pub fn load_directory(&mut self, root: &Path) -> Result<usize> {
        let files = self.fs.source_files(root)?;
        self.load_program(&files)?;
        Ok(files.len())
    }

    pub fn reset_session(&mut self) {
        self.session.ledger.reset();
        self.session.workspace.clear();
        info!("Session reset");
    }

    /// Setting the flag stops a running batch before its next move. The flag
    /// is cleared when a batch starts.
    pub fn cancellation_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn move_methods(&mut self, request: &MoveMethodsRequest) -> Result<MoveReport> {
        self.cancel.store(false, Ordering::SeqCst);
        batch::run(self, request)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}
