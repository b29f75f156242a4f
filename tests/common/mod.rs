// Test utility module for relocator integration tests
#![allow(dead_code)]

use once_cell::sync::Lazy;
use relocator::{Engine, MemoryFileSystem, RelocatorConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

/// Installs a subscriber once per test binary. `RUST_LOG=relocator=debug`
/// shows the pipeline spans.
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// An in-memory file system holding `files`.
pub fn memory_fs(files: &[(&str, &str)]) -> Arc<MemoryFileSystem> {
    let fs = Arc::new(MemoryFileSystem::new());
    for (path, text) in files {
        fs.insert_text(*path, text);
    }
    fs
}

pub fn engine_over(fs: &Arc<MemoryFileSystem>) -> Engine {
    init_tracing();
    Engine::new(fs.clone(), RelocatorConfig::default())
}

/// Contents of `path`, failing the test when it doesn't exist.
pub fn read(fs: &MemoryFileSystem, path: &str) -> String {
    fs.text(path)
        .unwrap_or_else(|| panic!("{path} should exist"))
}
