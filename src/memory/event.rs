//! Append-only, bounded history of memory state transitions

use super::block::BlockId;
use crate::interpreter::constants::EVENT_LOG_CAPACITY;
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Allocate,
    Deallocate,
    Assign,
    Copy,
    Move,
    Construct,
    Destruct,
    Leak,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::Allocate => "ALLOC",
            EventKind::Deallocate => "FREE",
            EventKind::Assign => "ASSIGN",
            EventKind::Copy => "COPY",
            EventKind::Move => "MOVE",
            EventKind::Construct => "CTOR",
            EventKind::Destruct => "DTOR",
            EventKind::Leak => "LEAK",
        };
        f.write_str(label)
    }
}

/// One immutable log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEvent {
    pub kind: EventKind,
    pub block: BlockId,
    pub description: String,
    /// Logical clock value when the event happened
    pub timestamp: u64,
}

/// Event history that evicts its oldest entry once `capacity` is reached
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<MemoryEvent>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        EventLog {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: MemoryEvent) {
        log::debug!("[{}] #{} {}", event.kind, event.block, event.description);
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &MemoryEvent> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&MemoryEvent> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(EVENT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(block: BlockId) -> MemoryEvent {
        MemoryEvent {
            kind: EventKind::Allocate,
            block,
            description: format!("block {}", block),
            timestamp: 0,
        }
    }

    #[test]
    fn test_oldest_entries_are_evicted() {
        let mut log = EventLog::new(3);
        for id in 1..=5 {
            log.push(event(id));
        }

        let ids: Vec<BlockId> = log.iter().map(|e| e.block).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn test_default_capacity() {
        let mut log = EventLog::default();
        for id in 0..250 {
            log.push(event(id));
        }
        assert_eq!(log.len(), EVENT_LOG_CAPACITY);
        assert_eq!(log.last().map(|e| e.block), Some(249));
    }
}
