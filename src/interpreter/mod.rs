//! Line-oriented script interpreter
//!
//! This module turns script text into [`MemoryManager`](crate::memory::MemoryManager)
//! operations:
//! - [`engine`]: [`Interpreter`], the batch and stepwise drivers and the statement handlers
//! - [`rules`]: the ordered (predicate, handler) classification table
//! - [`lexer`]: comment stripping, tokenization and declarator parsing
//! - [`types`]: primitive sizes and smart-pointer tag recognition
//! - [`errors`]: [`ScriptError`]
//!
//! # Execution Model
//!
//! There is no grammar and no AST. Each line is classified on its own by the first
//! matching rule and applied immediately. Only lines inside `main` touch memory;
//! class definitions are collected wherever they appear. The first failing line
//! aborts the run.

pub mod constants;
pub mod engine;
pub mod errors;
pub mod lexer;
pub mod rules;
pub mod types;

pub use engine::{Interpreter, Step};
pub use errors::ScriptError;
pub use rules::StatementKind;
