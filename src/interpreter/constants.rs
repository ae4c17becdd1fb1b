// Constants for the memory simulator

/// Starting address for heap allocations
/// Heap addresses start at 0x10000000 to clearly distinguish them from stack addresses
pub const HEAP_ADDRESS_START: u64 = 0x1000_0000;

/// Starting address for stack slots
pub const STACK_ADDRESS_START: u64 = 0x7FFF_0000;

/// Distance between two consecutive stack slots
pub const STACK_SLOT_STRIDE: u64 = 8;

/// Size of every pointer block, regardless of pointee or discipline
pub const POINTER_SIZE: usize = 8;

/// Number of events kept in the event log before the oldest is evicted
pub const EVENT_LOG_CAPACITY: usize = 100;
