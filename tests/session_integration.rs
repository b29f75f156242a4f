//! Cancellation, configuration discovery and runs against the real disk.

mod common;

use common::{init_tracing, memory_fs, read};
use indoc::indoc;
use relocator::io::TextFile;
use relocator::{
    Engine, ErrorCode, FileSystem, MemoryFileSystem, MoveMethodsRequest, RealFileSystem,
    RelocationError, RelocatorConfig, Result,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const SOURCE: &str = indoc! {"
    namespace Shop
    {
        public class A
        {
            public int Add(int x, int y)
            {
                return x + y;
            }

            public int Twice(int x)
            {
                return x * 2;
            }
        }
    }
"};

/// Raises a cancellation flag as soon as anything is written.
struct CancelOnWrite {
    inner: Arc<MemoryFileSystem>,
    flag: Mutex<Option<Arc<AtomicBool>>>,
}

impl FileSystem for CancelOnWrite {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read_bytes(path)
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(flag) = self.flag.lock().unwrap().as_ref() {
            flag.store(true, Ordering::SeqCst);
        }
        self.inner.write_bytes(path, bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }

    fn source_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        self.inner.source_files(root)
    }
}

#[test]
fn test_cancellation_stops_between_moves() {
    init_tracing();
    let memory = memory_fs(&[("/src/A.cs", SOURCE)]);
    let fs = Arc::new(CancelOnWrite {
        inner: memory.clone(),
        flag: Mutex::new(None),
    });
    let mut engine = Engine::new(fs.clone(), RelocatorConfig::default());
    *fs.flag.lock().unwrap() = Some(engine.cancellation_token());

    let err = engine
        .move_methods(&MoveMethodsRequest::new("/src/A.cs", "A", ["Add", "Twice"], "B"))
        .unwrap_err();

    match err {
        RelocationError::Cancelled { completed, skipped } => {
            assert_eq!(completed, vec!["Add".to_string()]);
            assert_eq!(skipped, vec!["Twice".to_string()]);
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
    let target = read(&memory, "/src/B.cs");
    assert!(target.contains("Add("));
    assert!(!target.contains("Twice("));
    assert!(engine.session().ledger.contains(Path::new("/src/A.cs"), "Add"));
}

#[test]
fn test_cancel_flag_is_cleared_when_a_batch_starts() {
    let memory = memory_fs(&[("/src/A.cs", SOURCE)]);
    let mut engine = common::engine_over(&memory);
    engine.cancellation_token().store(true, Ordering::SeqCst);

    let report = engine
        .move_methods(&MoveMethodsRequest::new("/src/A.cs", "A", ["Add"], "B"))
        .unwrap();

    assert_eq!(report.moved.len(), 1);
}

#[test]
fn test_discovered_config_shapes_new_files() {
    let memory = memory_fs(&[
        ("/repo/.relocator.toml", "new_file_namespace_style = \"file_scoped\"\n"),
        ("/repo/src/A.cs", SOURCE),
    ]);
    init_tracing();
    let mut engine = Engine::discover(memory.clone(), Path::new("/repo/src"));

    engine
        .move_methods(&MoveMethodsRequest::new("/repo/src/A.cs", "A", ["Add"], "B"))
        .unwrap();

    let target = read(&memory, "/repo/src/B.cs");
    assert!(target.starts_with("namespace Shop;"));
    assert!(target.contains("public static int Add(int x, int y)"));
}

#[test]
fn test_moves_on_disk_keep_encoding() {
    init_tracing();
    let dir = TempDir::new().expect("Failed to create temp directory");
    let source_path = dir.path().join("A.cs");
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(SOURCE.as_bytes());
    fs::write(&source_path, bytes).expect("Failed to write test file");

    let mut engine = Engine::new(Arc::new(RealFileSystem::new()), RelocatorConfig::default());
    assert_eq!(engine.load_directory(dir.path()).unwrap(), 1);
    let report = engine
        .move_methods(&MoveMethodsRequest::new(&source_path, "A", ["Add"], "B"))
        .unwrap();

    let target_path = dir.path().join("B.cs");
    assert!(report.created_target_file);
    let source = fs::read(&source_path).unwrap();
    let target = fs::read(&target_path).unwrap();
    assert!(source.starts_with(&[0xEF, 0xBB, 0xBF]));
    assert!(target.starts_with(&[0xEF, 0xBB, 0xBF]));

    let target = TextFile::decode(&target).unwrap().text;
    assert!(target.contains("public static int Add(int x, int y)"));
    let source = TextFile::decode(&source).unwrap().text;
    assert!(source.contains("return B.Add(x, y);"));
}

#[test]
fn test_missing_source_file_is_a_read_error() {
    let memory = memory_fs(&[]);
    let mut engine = common::engine_over(&memory);

    let err = engine
        .move_methods(&MoveMethodsRequest::new("/src/Nope.cs", "A", ["Add"], "B"))
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::IO_READ);
    assert!(err.to_string().contains("Nope.cs"));
}
