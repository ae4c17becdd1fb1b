//! Memory model for the simulator
//!
//! This module provides the core memory abstractions:
//! - [`block`]: Simulated allocations ([`MemoryBlock`]) and class layouts ([`ClassLayout`])
//! - [`event`]: The bounded, append-only event log
//! - [`manager`]: [`MemoryManager`], the registry that enforces the ownership rules
//!
//! # Block Sizes
//!
//! Sizes are fixed and platform-independent:
//! - `char`, `bool`: 1 byte
//! - `short`: 2 bytes
//! - `int`, `float`: 4 bytes
//! - `long`, `double`, `size_t`: 8 bytes
//! - pointer: 8 bytes (regardless of pointee type or ownership discipline)
//! - class: sum of member sizes (no padding or alignment)
//!
//! # Addresses
//!
//! Addresses are synthetic and exist for display only. Stack slots are laid out from
//! [`STACK_ADDRESS_START`](crate::interpreter::constants::STACK_ADDRESS_START) by slot
//! index; heap blocks are bump-allocated from
//! [`HEAP_ADDRESS_START`](crate::interpreter::constants::HEAP_ADDRESS_START).

pub mod block;
pub mod event;
pub mod manager;

pub use block::{
    Address, BlockId, ClassLayout, Content, Discipline, Member, MemoryBlock, PointerSlot, Storage,
    StorageClass,
};
pub use event::{EventKind, EventLog, MemoryEvent};
pub use manager::{MemoryError, MemoryManager, MemoryStats};
