//! Terminal step viewer built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into three layers:
//!
//! - **[`app`]**: viewer state, keyboard event loop, pane focus and auto-play
//! - **[`panes`]**: stateless render functions for each visible pane (source, stack,
//!   heap, events, status bar)
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! The viewer never runs the interpreter itself. Construct an [`App`] from the
//! [`SnapshotManager`] produced by [`record`] and call [`App::run`].
//!
//! [`SnapshotManager`]: crate::snapshot::SnapshotManager
//! [`record`]: crate::snapshot::record
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;
