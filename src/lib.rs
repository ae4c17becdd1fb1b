//! # Introduction
//!
//! memviz simulates how a small C++-like program uses memory. Each line of a
//! script is classified and applied to a simulated memory registry that tracks
//! stack slots, heap blocks, raw pointers, `unique_ptr` and `shared_ptr`
//! ownership. Every transition is logged, and leaks and dangling pointers show up
//! as they happen.
//!
//! ## Execution pipeline
//!
//! ```text
//! Script → Interpreter (line rules) → MemoryManager → Snapshots → TUI
//! ```
//!
//! 1. [`interpreter`]: classifies each line with an ordered rule table and
//!    turns it into memory operations.
//! 2. [`memory`]: the block arena, the ownership rules and the bounded event log.
//! 3. [`snapshot`]: records the memory state before every line so a run can be
//!    stepped backward and forward.
//! 4. [`demos`]: built-in example scripts.
//! 5. [`ui`]: ratatui-based step viewer; not part of the stable library API.
//!
//! ## Supported subset
//!
//! Primitive and class declarations, raw `new`/`delete`, `std::unique_ptr` and
//! `std::shared_ptr` with their factories, `std::move`, pointer assignment, and
//! scopes opened by `{`. Values are not modeled and lines outside the subset
//! are ignored.
//!
//! ```
//! use memviz::interpreter::Interpreter;
//!
//! let mut interpreter = Interpreter::new();
//! interpreter
//!     .execute("int main() {\n  int* p = new int;\n  return 0;\n}")
//!     .unwrap();
//! assert_eq!(interpreter.memory().detect_leaks().len(), 1);
//! ```

pub mod demos;
pub mod interpreter;
pub mod memory;
pub mod snapshot;
pub mod ui;
