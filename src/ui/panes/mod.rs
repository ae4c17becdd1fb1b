//! TUI pane rendering modules
//!
//! - [`source`]: script text with the current line highlighted
//! - [`stack`]: live stack slots, pointer targets and object members
//! - [`heap`]: live heap blocks with ownership, reference counts and leak flags
//! - [`events`]: the bounded memory event log
//! - [`status`]: step counter, memory totals and keybindings
//!
//! Each module exports one `render_*` function. The list panes share the
//! auto-scroll behavior in `utils`.

mod utils;

pub mod events;
pub mod heap;
pub mod source;
pub mod stack;
pub mod status;

pub use events::render_events_pane;
pub use heap::render_heap_pane;
pub use source::{render_source_pane, SourceScrollState};
pub use stack::render_stack_pane;
pub use status::{render_status_bar, StatusRenderData};
pub use utils::ScrollState;
