//! Error type for relocation operations.
//!
//! Every failure carries a stable [`ErrorCode`]. Codes are assigned by
//! category:
//! - R001-R009: preconditions, checked before any tree is changed
//! - R010: the method was already moved in this session
//! - R020: a batch stopped part way through
//! - R030-R031: file reads and writes
//! - R040: source text that does not parse
//! - R050: cancellation between moves
//!
//! # Example
//!
//! ```rust
//! use relocator::errors::{ErrorCode, RelocationError};
//!
//! let err = RelocationError::method_not_found("Add", "A", "src/A.cs");
//! assert_eq!(err.code(), ErrorCode::METHOD_NOT_FOUND);
//! assert!(err.is_precondition());
//! assert!(!err.is_retryable());
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorCode(&'static str);

impl ErrorCode {
    /// Source or target type not found
    pub const TYPE_NOT_FOUND: ErrorCode = ErrorCode("R001");
    /// Method not found in the source type
    pub const METHOD_NOT_FOUND: ErrorCode = ErrorCode("R002");
    /// Same method named twice in one batch
    pub const DUPLICATE_IN_BATCH: ErrorCode = ErrorCode("R003");
    /// Override with restricted accessibility
    pub const RESTRICTED_OVERRIDE: ErrorCode = ErrorCode("R004");
    /// Target declaration conflicts with the move
    pub const TARGET_CONFLICT: ErrorCode = ErrorCode("R005");
    /// Method has no body to move
    pub const NO_BODY: ErrorCode = ErrorCode("R006");
    /// Construct the engine cannot rewrite safely
    pub const UNSUPPORTED: ErrorCode = ErrorCode("R007");
    /// Injected dependency that isn't a member of the source type
    pub const UNKNOWN_DEPENDENCY: ErrorCode = ErrorCode("R008");
    /// Several overloads share the requested name
    pub const AMBIGUOUS_OVERLOAD: ErrorCode = ErrorCode("R009");

    pub const ALREADY_MOVED: ErrorCode = ErrorCode("R010");
    pub const PARTIAL_BATCH: ErrorCode = ErrorCode("R020");
    pub const IO_READ: ErrorCode = ErrorCode("R030");
    pub const IO_WRITE: ErrorCode = ErrorCode("R031");
    pub const PARSE: ErrorCode = ErrorCode("R040");
    pub const CANCELLED: ErrorCode = ErrorCode("R050");

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum RelocationError {
    /// A rule that must hold before anything is rewritten.
    #[error("[{code}] {message}")]
    Precondition { code: ErrorCode, message: String },

    #[error(
        "[R010] '{method}' in {} was already moved in this session; \
         use inline-method on the stub instead of moving it again",
        .path.display()
    )]
    AlreadyMoved { method: String, path: PathBuf },

    /// Some methods of a batch moved before one failed.
    #[error(
        "[R020] batch stopped at '{failed}' after moving [{}]: {cause}",
        .completed.join(", ")
    )]
    PartialBatch {
        completed: Vec<String>,
        failed: String,
        cause: Box<RelocationError>,
        skipped: Vec<String>,
    },

    #[error("[{code}] {action} {}: {source}", .path.display())]
    Io {
        code: ErrorCode,
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[R040] {}:{line}:{column}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("[R050] relocation cancelled after moving [{}]", .completed.join(", "))]
    Cancelled {
        completed: Vec<String>,
        skipped: Vec<String>,
    },
}

impl RelocationError {
    #[must_use]
    pub fn precondition(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Precondition {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn type_not_found(type_name: &str, path: impl AsRef<Path>) -> Self {
        Self::precondition(
            ErrorCode::TYPE_NOT_FOUND,
            format!(
                "type '{type_name}' not found in {}",
                path.as_ref().display()
            ),
        )
    }

    #[must_use]
    pub fn method_not_found(method: &str, type_name: &str, path: impl AsRef<Path>) -> Self {
        Self::precondition(
            ErrorCode::METHOD_NOT_FOUND,
            format!(
                "method '{method}' not found in type '{type_name}' ({})",
                path.as_ref().display()
            ),
        )
    }

    #[must_use]
    pub fn unsupported(method: &str, rule: impl std::fmt::Display) -> Self {
        Self::precondition(
            ErrorCode::UNSUPPORTED,
            format!("cannot move '{method}': {rule}"),
        )
    }

    #[must_use]
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            code: ErrorCode::IO_READ,
            action: "failed to read",
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            code: ErrorCode::IO_WRITE,
            action: "failed to write",
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn parse(path: impl Into<PathBuf>, err: crate::syntax::ParseError) -> Self {
        Self::Parse {
            path: path.into(),
            line: err.line,
            column: err.column,
            message: err.message,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Precondition { code, .. } | Self::Io { code, .. } => *code,
            Self::AlreadyMoved { .. } => ErrorCode::ALREADY_MOVED,
            Self::PartialBatch { .. } => ErrorCode::PARTIAL_BATCH,
            Self::Parse { .. } => ErrorCode::PARSE,
            Self::Cancelled { .. } => ErrorCode::CANCELLED,
        }
    }

    /// Raised before any mutation; retrying without changing the request
    /// fails the same way.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. } | Self::AlreadyMoved { .. })
    }

    /// Only transient I/O conditions are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            Self::PartialBatch { cause, .. } => cause.is_retryable(),
            _ => false,
        }
    }

    /// The error that actually stopped the operation.
    pub fn root_cause(&self) -> &RelocationError {
        match self {
            Self::PartialBatch { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, RelocationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_categories() {
        let err = RelocationError::type_not_found("B", "x.cs");
        assert_eq!(err.code().as_str(), "R001");
        assert!(err.to_string().contains("type 'B' not found in x.cs"));

        let moved = RelocationError::AlreadyMoved {
            method: "Add".into(),
            path: "a.cs".into(),
        };
        assert_eq!(moved.code(), ErrorCode::ALREADY_MOVED);
        assert!(moved.to_string().contains("inline-method"));
        assert!(moved.is_precondition());
    }

    #[test]
    fn partial_batch_exposes_root_cause() {
        let err = RelocationError::PartialBatch {
            completed: vec!["One".into()],
            failed: "Two".into(),
            cause: Box::new(RelocationError::write(
                "b.cs",
                std::io::Error::new(std::io::ErrorKind::TimedOut, "slow disk"),
            )),
            skipped: vec!["Three".into()],
        };
        assert_eq!(err.code(), ErrorCode::PARTIAL_BATCH);
        assert_eq!(err.root_cause().code(), ErrorCode::IO_WRITE);
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("[R020] batch stopped at 'Two' after moving [One]"));
    }
}
