//! Lossless syntax layer for the C# subset the relocation engine edits.

pub mod format;
pub mod lexer;
pub mod modifiers;
pub mod parser;
pub mod scan;
pub mod token;
pub mod tree;

use thiserror::Error;

pub use format::{detect_indent, format_unit, FormatOptions};
pub use lexer::{tokenize, LexError};
pub use modifiers::Visibility;
pub use parser::{parse_compilation_unit, parse_member, parse_type};
pub use scan::{scan, BodyScan, LocalScope, Occurrence, OccurrenceKind};
pub use token::{Token, TokenKind};
pub use tree::{
    CompilationUnit, ConstructorDecl, FieldDecl, Item, Member, MethodBody, MethodDecl,
    NamespaceDecl, Param, ParamList, PropertyDecl, TypeBody, TypeDecl, TypeKind,
    UsingDirective,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {line}:{column}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self {
            line: err.line,
            column: err.column,
            message: err.message,
        }
    }
}
