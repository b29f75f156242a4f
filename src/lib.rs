//! Moves methods between C# type declarations.
//!
//! A moved method lands in the target type as a static or an instance
//! method, with its body rewritten so it no longer needs the receiver it
//! lost. The source keeps a stub with the original signature that delegates
//! to the new location, so callers keep compiling. See [`engine::Engine`]
//! for the entry point.

// Export modules for library usage
pub mod config;
pub mod engine;
pub mod errors;
pub mod io;
pub mod relocation;
pub mod syntax;
pub mod workspace;

// Re-export commonly used types
pub use crate::config::{load_config, RelocatorConfig};
pub use crate::engine::{Engine, MoveMethodsRequest, MoveReport, MovedMethod, Session};
pub use crate::errors::{ErrorCode, RelocationError, Result};
pub use crate::io::{FileSystem, MemoryFileSystem, RealFileSystem};
pub use crate::relocation::{AccessMemberKind, MoveLedger, MoveRequest};
pub use crate::syntax::{parse_compilation_unit, CompilationUnit};
