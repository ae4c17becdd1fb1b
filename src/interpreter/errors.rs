//! Script-level error types
//!
//! [`ScriptError`] covers every failure that aborts a script: a line that tries a
//! modeled operation but names something that does not exist, or a memory
//! operation the [`MemoryManager`](crate::memory::MemoryManager) rejected.
//!
//! Lines outside the supported subset are not errors; they are accepted as no-ops.
//! Every error carries the 1-based line it was raised on and renders as
//! `Line N: reason`.

use crate::memory::MemoryError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("Line {line}: undefined variable '{name}'")]
    UndefinedVariable { name: String, line: usize },

    #[error("Line {line}: '{name}' is not a pointer")]
    NotAPointer { name: String, line: usize },

    /// `delete` on a pointer that points nowhere (already deleted, or never set)
    #[error("Line {line}: cannot delete '{name}': pointer is null or dangling")]
    NullDelete { name: String, line: usize },

    #[error("Line {line}: delete needs a variable name")]
    InvalidDelete { line: usize },

    #[error("Line {line}: unknown class '{name}'")]
    UnknownClass { name: String, line: usize },

    #[error("Line {line}: invalid class declaration")]
    InvalidClassDeclaration { line: usize },

    #[error("Line {line}: class '{name}' is already defined")]
    ClassRedefinition { name: String, line: usize },

    /// A class used as a by-value member of itself
    #[error("Line {line}: class '{name}' cannot contain itself")]
    RecursiveClass { name: String, line: usize },

    #[error("Line {line}: invalid declaration: {text}")]
    InvalidDeclaration { text: String, line: usize },

    /// A name whose block was released when its scope ended
    #[error("Line {line}: '{name}' is out of scope")]
    OutOfScope { name: String, line: usize },

    #[error("Line {line}: size of '{name}' does not fit in memory")]
    SizeOverflow { name: String, line: usize },

    #[error("Line {line}: missing variable name")]
    MissingVariableName { line: usize },

    #[error("Line {line}: unexpected scope end")]
    UnexpectedScopeEnd { line: usize },

    #[error("Line {line}: {source}")]
    Rejected { source: MemoryError, line: usize },
}

impl ScriptError {
    /// 1-based line the error was raised on
    pub fn line(&self) -> usize {
        match self {
            ScriptError::UndefinedVariable { line, .. }
            | ScriptError::NotAPointer { line, .. }
            | ScriptError::NullDelete { line, .. }
            | ScriptError::InvalidDelete { line }
            | ScriptError::UnknownClass { line, .. }
            | ScriptError::InvalidClassDeclaration { line }
            | ScriptError::ClassRedefinition { line, .. }
            | ScriptError::RecursiveClass { line, .. }
            | ScriptError::InvalidDeclaration { line, .. }
            | ScriptError::OutOfScope { line, .. }
            | ScriptError::SizeOverflow { line, .. }
            | ScriptError::MissingVariableName { line }
            | ScriptError::UnexpectedScopeEnd { line }
            | ScriptError::Rejected { line, .. } => *line,
        }
    }
}
