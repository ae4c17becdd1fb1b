//! The simulated memory registry
//!
//! [`MemoryManager`] is the single owner of every [`MemoryBlock`] and of the event
//! log. All state transitions go through its operations so the ownership rules hold
//! after every call:
//!
//! - ids are handed out monotonically from 1 and never reused
//! - a freed block stays in the registry as history but is never a valid target again
//! - shared reference counts never go below zero, and reaching zero frees the block
//! - freeing a block clears `points_to` on every pointer that referenced it
//!
//! Rejected operations return a [`MemoryError`] and leave the registry untouched.

use super::block::{
    Address, BlockId, ClassLayout, Content, Discipline, MemoryBlock, PointerSlot, Storage,
};
use super::event::{EventKind, EventLog, MemoryEvent};
use crate::interpreter::constants::{
    EVENT_LOG_CAPACITY, HEAP_ADDRESS_START, POINTER_SIZE, STACK_ADDRESS_START, STACK_SLOT_STRIDE,
};
use rustc_hash::FxHashSet;
use std::rc::Rc;
use thiserror::Error;

/// Reasons a memory operation is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("unknown block #{0}")]
    UnknownBlock(BlockId),

    #[error("block #{0} has already been freed")]
    AlreadyFreed(BlockId),

    #[error("block #{0} is not a pointer")]
    NotAPointer(BlockId),

    #[error("block #{id} is not a {expected}")]
    WrongDiscipline { id: BlockId, expected: Discipline },

    #[error("cannot move unique_ptr #{0} into itself")]
    SelfMove(BlockId),
}

/// Aggregate figures over the live registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryStats {
    pub total_blocks: usize,
    pub live_blocks: usize,
    pub stack_bytes: usize,
    pub heap_bytes: usize,
    pub leaked_blocks: usize,
    pub leaked_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryManager {
    blocks: Vec<MemoryBlock>,
    events: EventLog,
    next_id: BlockId,
    stack_depth: usize,
    next_heap_address: Address,
    clock: u64,
}

impl MemoryManager {
    pub fn new() -> Self {
        Self::with_event_capacity(EVENT_LOG_CAPACITY)
    }

    /// Create a manager whose event log keeps at most `capacity` entries
    pub fn with_event_capacity(capacity: usize) -> Self {
        MemoryManager {
            blocks: Vec::new(),
            events: EventLog::new(capacity),
            next_id: 1,
            stack_depth: 0,
            next_heap_address: HEAP_ADDRESS_START,
            clock: 0,
        }
    }

    // ---- creation ----

    /// Push a plain value onto the stack
    pub fn create_stack_variable(&mut self, name: &str, size: usize) -> BlockId {
        let id = self.push_stack_block(name, size, Content::Value);
        self.record(
            EventKind::Allocate,
            id,
            format!("stack variable {} ({} bytes)", name, size),
        );
        id
    }

    /// Push a pointer onto the stack, initially null
    pub fn create_stack_pointer(
        &mut self,
        name: &str,
        discipline: Discipline,
        pointee_class: Option<Rc<ClassLayout>>,
    ) -> BlockId {
        let id = self.create_stack_variable(name, POINTER_SIZE);
        if let Some(block) = self.block_mut(id) {
            block.content = Content::Pointer(PointerSlot {
                discipline,
                points_to: None,
                pointee_class,
            });
        }
        id
    }

    /// Push a class instance onto the stack
    pub fn create_class_object(&mut self, name: &str, layout: Rc<ClassLayout>) -> BlockId {
        let size = layout.total_size;
        let description = format!("object {} of class {} ({} bytes)", name, layout.name, size);
        let id = self.push_stack_block(name, size, Content::Object(layout));
        self.record(EventKind::Construct, id, description);
        id
    }

    /// Allocate a primitive on the heap under `discipline`
    ///
    /// Shared allocations start with a reference count of one.
    pub fn allocate_heap(&mut self, name: &str, size: usize, discipline: Discipline) -> BlockId {
        let id = self.push_heap_block(name, size, discipline, Content::Value);
        self.record(
            EventKind::Allocate,
            id,
            format!("heap allocation {} ({}, {} bytes)", name, discipline, size),
        );
        id
    }

    /// Allocate a class instance on the heap under `discipline`
    pub fn allocate_class_object_heap(
        &mut self,
        name: &str,
        layout: Rc<ClassLayout>,
        discipline: Discipline,
    ) -> BlockId {
        let size = layout.total_size;
        let description = format!(
            "heap object {} of class {} ({}, {} bytes)",
            name, layout.name, discipline, size
        );
        let id = self.push_heap_block(name, size, discipline, Content::Object(layout));
        self.record(EventKind::Construct, id, description);
        id
    }

    // ---- ownership operations ----

    /// Free a block
    ///
    /// A shared-managed block with more than one owner only loses one owner.
    pub fn deallocate(&mut self, id: BlockId) -> Result<(), MemoryError> {
        let idx = self.live_index(id)?;
        if matches!(self.blocks[idx].storage, Storage::SharedHeap { ref_count } if ref_count > 1) {
            self.release(id);
            return Ok(());
        }
        self.free_block(idx, "freed");
        Ok(())
    }

    /// Point `pointer` at `target` (or at nothing)
    ///
    /// A shared pointer gives up its old target first and takes a reference on the
    /// new one. A freshly allocated shared block already carries the reference of
    /// its first owner, so the first shared pointer to reach it adopts that
    /// reference instead of adding another.
    pub fn assign_pointer(
        &mut self,
        pointer: BlockId,
        target: Option<BlockId>,
    ) -> Result<(), MemoryError> {
        let idx = self.live_index(pointer)?;
        let slot = self.blocks[idx]
            .pointer()
            .ok_or(MemoryError::NotAPointer(pointer))?;
        let discipline = slot.discipline;
        let old = slot.points_to;

        if let Some(target) = target {
            self.live_index(target)?;
        }

        if old == target {
            return Ok(());
        }

        if discipline == Discipline::Shared {
            if let Some(old) = old {
                self.release(old);
            }
        }

        let adopts = match target {
            Some(target) => discipline == Discipline::Shared && self.shared_owners(target) == 0,
            None => false,
        };

        if let Some(slot) = self.blocks[idx].pointer_mut() {
            slot.points_to = target;
        }

        let name = self.blocks[idx].name.clone();
        match target {
            Some(target) => {
                if discipline == Discipline::Shared && !adopts {
                    self.retain(target);
                }
                let target_name = self.block_name(target);
                self.record(
                    EventKind::Assign,
                    pointer,
                    format!("{} -> {}", name, target_name),
                );
            }
            None => {
                self.record(EventKind::Assign, pointer, format!("{} = nullptr", name));
            }
        }
        Ok(())
    }

    /// Copy-construct a shared pointer into a new stack slot named `new_name`
    pub fn copy_shared(&mut self, source: BlockId, new_name: &str) -> Result<BlockId, MemoryError> {
        let idx = self.live_index(source)?;
        let slot = self.blocks[idx]
            .pointer()
            .ok_or(MemoryError::NotAPointer(source))?;
        if slot.discipline != Discipline::Shared {
            return Err(MemoryError::WrongDiscipline {
                id: source,
                expected: Discipline::Shared,
            });
        }
        let target = slot.points_to;
        let pointee_class = slot.pointee_class.clone();
        let source_name = self.blocks[idx].name.clone();

        let id = self.push_stack_block(
            new_name,
            POINTER_SIZE,
            Content::Pointer(PointerSlot {
                discipline: Discipline::Shared,
                points_to: target,
                pointee_class,
            }),
        );

        let description = match target {
            Some(target) => {
                self.retain(target);
                let count = self
                    .block(target)
                    .and_then(MemoryBlock::ref_count)
                    .unwrap_or(0);
                format!(
                    "shared_ptr copy {} <- {} (ref count {})",
                    new_name, source_name, count
                )
            }
            None => format!("shared_ptr copy {} <- {} (empty)", new_name, source_name),
        };
        self.record(EventKind::Copy, id, description);
        Ok(id)
    }

    /// Transfer ownership from one unique pointer to another
    ///
    /// The destination's previous pointee, if any, is destroyed; the source is left
    /// empty. Reference counts are never touched.
    pub fn move_unique(&mut self, source: BlockId, dest: BlockId) -> Result<(), MemoryError> {
        if source == dest {
            return Err(MemoryError::SelfMove(source));
        }
        let src_idx = self.live_index(source)?;
        let dst_idx = self.live_index(dest)?;
        let moved = self.unique_target(src_idx)?;
        let previous = self.unique_target(dst_idx)?;

        if let Some(previous) = previous.filter(|&p| Some(p) != moved) {
            self.deallocate(previous)?;
        }

        if let Some(slot) = self.blocks[dst_idx].pointer_mut() {
            slot.points_to = moved;
        }
        if let Some(slot) = self.blocks[src_idx].pointer_mut() {
            slot.points_to = None;
        }

        let description = format!(
            "unique_ptr move {} -> {}",
            self.blocks[src_idx].name, self.blocks[dst_idx].name
        );
        self.record(EventKind::Move, dest, description);
        Ok(())
    }

    /// Leave one lexical scope: pop the most recent live stack block
    ///
    /// An owning pointer takes its pointee with it: a unique pointer frees it, a
    /// shared pointer drops one reference. Returns the popped block, if any.
    pub fn end_scope(&mut self) -> Option<BlockId> {
        let idx = self
            .blocks
            .iter()
            .rposition(|b| b.allocated && b.is_stack())?;
        let id = self.blocks[idx].id;
        let owned = self.blocks[idx]
            .pointer()
            .and_then(|slot| slot.points_to.map(|target| (slot.discipline, target)));

        self.free_block(idx, "goes out of scope");

        match owned {
            Some((Discipline::Unique, target)) => {
                if let Err(err) = self.deallocate(target) {
                    log::warn!("unique_ptr #{} could not free #{}: {}", id, target, err);
                }
                self.clear_pointer(idx);
            }
            Some((Discipline::Shared, target)) => {
                self.release(target);
                self.clear_pointer(idx);
            }
            _ => {}
        }
        Some(id)
    }

    /// Raw heap blocks that are still allocated but referenced by no live pointer
    ///
    /// Smart-managed blocks are never reported: their discipline is assumed to
    /// reclaim them through scope exit or reference counting.
    pub fn detect_leaks(&self) -> Vec<BlockId> {
        let referenced: FxHashSet<BlockId> = self
            .blocks
            .iter()
            .filter(|b| b.allocated)
            .filter_map(MemoryBlock::points_to)
            .collect();

        self.blocks
            .iter()
            .filter(|b| b.allocated && b.storage == Storage::Heap)
            .filter(|b| !referenced.contains(&b.id))
            .map(|b| b.id)
            .collect()
    }

    /// Run [`detect_leaks`](Self::detect_leaks) and log one event per leak
    pub fn report_leaks(&mut self) -> Vec<BlockId> {
        let leaks = self.detect_leaks();
        for &id in &leaks {
            let (name, size) = self
                .block(id)
                .map(|b| (b.name.clone(), b.size))
                .unwrap_or_default();
            log::warn!("memory leak: {} ({} bytes)", name, size);
            self.record(
                EventKind::Leak,
                id,
                format!("leak: {} ({} bytes) is unreachable", name, size),
            );
        }
        leaks
    }

    // ---- accessors ----

    /// Every block ever created, freed ones included, in creation order
    pub fn blocks(&self) -> &[MemoryBlock] {
        &self.blocks
    }

    pub fn live_blocks(&self) -> impl Iterator<Item = &MemoryBlock> {
        self.blocks.iter().filter(|b| b.allocated)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn block(&self, id: BlockId) -> Option<&MemoryBlock> {
        self.index_of(id).map(|idx| &self.blocks[idx])
    }

    /// Mutable access for attaching metadata right after creation
    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut MemoryBlock> {
        let idx = self.index_of(id)?;
        Some(&mut self.blocks[idx])
    }

    pub fn stack_depth(&self) -> usize {
        self.stack_depth
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Id the next created block will receive
    pub fn next_id(&self) -> BlockId {
        self.next_id
    }

    /// Advance the logical clock and age every live block
    pub fn tick(&mut self) {
        self.clock += 1;
        for block in self.blocks.iter_mut().filter(|b| b.allocated) {
            block.lifetime += 1;
        }
    }

    pub fn stats(&self) -> MemoryStats {
        let leaks = self.detect_leaks();
        let mut stats = MemoryStats {
            total_blocks: self.blocks.len(),
            leaked_blocks: leaks.len(),
            ..Default::default()
        };
        for block in self.live_blocks() {
            stats.live_blocks += 1;
            if block.is_stack() {
                stats.stack_bytes = stats.stack_bytes.saturating_add(block.size);
            } else {
                stats.heap_bytes = stats.heap_bytes.saturating_add(block.size);
            }
        }
        stats.leaked_bytes = leaks
            .iter()
            .filter_map(|&id| self.block(id))
            .fold(0usize, |total, b| total.saturating_add(b.size));
        stats
    }

    /// Drop every block and event and restart ids from 1
    pub fn reset(&mut self) {
        self.blocks.clear();
        self.events.clear();
        self.next_id = 1;
        self.stack_depth = 0;
        self.next_heap_address = HEAP_ADDRESS_START;
        self.clock = 0;
    }

    // ---- internals ----

    fn index_of(&self, id: BlockId) -> Option<usize> {
        // Blocks are never removed, so id n sits at index n - 1.
        let idx = (id as usize).checked_sub(1)?;
        self.blocks.get(idx).filter(|b| b.id == id).map(|_| idx)
    }

    fn live_index(&self, id: BlockId) -> Result<usize, MemoryError> {
        let idx = self.index_of(id).ok_or(MemoryError::UnknownBlock(id))?;
        if !self.blocks[idx].allocated {
            return Err(MemoryError::AlreadyFreed(id));
        }
        Ok(idx)
    }

    fn unique_target(&self, idx: usize) -> Result<Option<BlockId>, MemoryError> {
        let block = &self.blocks[idx];
        let slot = block.pointer().ok_or(MemoryError::NotAPointer(block.id))?;
        if slot.discipline != Discipline::Unique {
            return Err(MemoryError::WrongDiscipline {
                id: block.id,
                expected: Discipline::Unique,
            });
        }
        Ok(slot.points_to)
    }

    fn block_name(&self, id: BlockId) -> String {
        self.block(id)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| format!("#{}", id))
    }

    fn allocate_id(&mut self) -> BlockId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn push_stack_block(&mut self, name: &str, size: usize, content: Content) -> BlockId {
        let id = self.allocate_id();
        let slot = self.stack_depth;
        self.blocks.push(MemoryBlock {
            id,
            name: name.to_string(),
            size,
            address: STACK_ADDRESS_START + slot as u64 * STACK_SLOT_STRIDE,
            storage: Storage::Stack { slot },
            content,
            allocated: true,
            lifetime: 0,
        });
        self.stack_depth += 1;
        id
    }

    fn push_heap_block(
        &mut self,
        name: &str,
        size: usize,
        discipline: Discipline,
        content: Content,
    ) -> BlockId {
        let id = self.allocate_id();
        let address = self.next_heap_address;
        // Keep heap addresses 8-byte aligned, and distinct even for empty blocks.
        let step = (size.max(1) as u64).saturating_add(7) & !7;
        self.next_heap_address = self.next_heap_address.saturating_add(step);
        self.blocks.push(MemoryBlock {
            id,
            name: name.to_string(),
            size,
            address,
            storage: Storage::heap_for(discipline),
            content,
            allocated: true,
            lifetime: 0,
        });
        id
    }

    /// Mark a block dead and clear every pointer that referenced it
    fn free_block(&mut self, idx: usize, reason: &str) {
        let block = &mut self.blocks[idx];
        block.allocated = false;
        if let Storage::SharedHeap { ref_count } = &mut block.storage {
            *ref_count = 0;
        }
        let id = block.id;
        let kind = if block.is_object() {
            EventKind::Destruct
        } else {
            EventKind::Deallocate
        };
        let description = format!("{} {}", block.name, reason);
        if block.is_stack() {
            self.stack_depth = self.stack_depth.saturating_sub(1);
        }
        self.record(kind, id, description);

        for other in self.blocks.iter_mut() {
            if let Some(slot) = other.pointer_mut() {
                if slot.points_to == Some(id) {
                    slot.points_to = None;
                }
            }
        }
    }

    fn clear_pointer(&mut self, idx: usize) {
        if let Some(slot) = self.blocks[idx].pointer_mut() {
            slot.points_to = None;
        }
    }

    /// Live shared pointers currently referencing `id`
    fn shared_owners(&self, id: BlockId) -> usize {
        self.live_blocks()
            .filter_map(MemoryBlock::pointer)
            .filter(|slot| slot.discipline == Discipline::Shared && slot.points_to == Some(id))
            .count()
    }

    fn retain(&mut self, id: BlockId) {
        let Some(idx) = self.index_of(id) else {
            return;
        };
        if let Storage::SharedHeap { ref_count } = &mut self.blocks[idx].storage {
            *ref_count += 1;
        }
    }

    /// Drop one shared reference; the last one frees the block
    fn release(&mut self, id: BlockId) {
        let Some(idx) = self.index_of(id) else {
            return;
        };
        let block = &mut self.blocks[idx];
        if !block.allocated {
            return;
        }
        let remaining = match &mut block.storage {
            Storage::SharedHeap { ref_count } if *ref_count > 0 => {
                *ref_count -= 1;
                *ref_count
            }
            _ => return,
        };
        let description = format!("ref count of {} is now {}", block.name, remaining);
        self.record(EventKind::Assign, id, description);
        if remaining == 0 {
            self.free_block(idx, "freed (last shared owner gone)");
        }
    }

    fn record(&mut self, kind: EventKind, block: BlockId, description: String) {
        self.events.push(MemoryEvent {
            kind,
            block,
            description,
            timestamp: self.clock,
        });
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_pointer_to_new_int(memory: &mut MemoryManager, name: &str) -> (BlockId, BlockId) {
        let ptr = memory.create_stack_pointer(name, Discipline::Raw, None);
        let heap = memory.allocate_heap("int", 4, Discipline::Raw);
        memory.assign_pointer(ptr, Some(heap)).unwrap();
        (ptr, heap)
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut memory = MemoryManager::new();
        let a = memory.create_stack_variable("a", 4);
        let b = memory.allocate_heap("b", 4, Discipline::Raw);
        assert_eq!((a, b), (1, 2));
        assert_eq!(memory.next_id(), 3);
    }

    #[test]
    fn test_deallocate_rejects_unknown_and_freed() {
        let mut memory = MemoryManager::new();
        let heap = memory.allocate_heap("x", 4, Discipline::Raw);
        assert_eq!(memory.deallocate(99), Err(MemoryError::UnknownBlock(99)));
        assert!(memory.deallocate(heap).is_ok());
        assert_eq!(memory.deallocate(heap), Err(MemoryError::AlreadyFreed(heap)));
    }

    #[test]
    fn test_deallocate_clears_every_alias() {
        let mut memory = MemoryManager::new();
        let (p1, heap) = raw_pointer_to_new_int(&mut memory, "p1");
        let p2 = memory.create_stack_pointer("p2", Discipline::Raw, None);
        memory.assign_pointer(p2, Some(heap)).unwrap();

        memory.deallocate(heap).unwrap();

        assert_eq!(memory.block(p1).unwrap().points_to(), None);
        assert_eq!(memory.block(p2).unwrap().points_to(), None);
        assert!(!memory.block(heap).unwrap().allocated);
    }

    #[test]
    fn test_assign_rejects_dead_target_without_change() {
        let mut memory = MemoryManager::new();
        let (ptr, heap) = raw_pointer_to_new_int(&mut memory, "p");
        let other = memory.allocate_heap("other", 4, Discipline::Raw);
        memory.deallocate(other).unwrap();

        assert_eq!(
            memory.assign_pointer(ptr, Some(other)),
            Err(MemoryError::AlreadyFreed(other))
        );
        assert_eq!(memory.block(ptr).unwrap().points_to(), Some(heap));
    }

    #[test]
    fn test_assign_to_non_pointer_is_rejected() {
        let mut memory = MemoryManager::new();
        let value = memory.create_stack_variable("x", 4);
        assert_eq!(
            memory.assign_pointer(value, None),
            Err(MemoryError::NotAPointer(value))
        );
    }

    #[test]
    fn test_shared_reassignment_releases_old_target() {
        let mut memory = MemoryManager::new();
        let ptr = memory.create_stack_pointer("sp", Discipline::Shared, None);
        let first = memory.allocate_heap("first", 4, Discipline::Shared);
        memory.assign_pointer(ptr, Some(first)).unwrap();
        // The first owner adopts the allocation's initial reference.
        assert_eq!(memory.block(first).unwrap().ref_count(), Some(1));

        let second = memory.allocate_heap("second", 4, Discipline::Shared);
        memory.assign_pointer(ptr, Some(second)).unwrap();

        assert!(!memory.block(first).unwrap().allocated);
        assert_eq!(memory.block(ptr).unwrap().points_to(), Some(second));
    }

    #[test]
    fn test_copy_shared_increments_and_scope_exit_frees_once() {
        let mut memory = MemoryManager::new();
        let p1 = memory.create_stack_pointer("p1", Discipline::Shared, None);
        let target = memory.allocate_heap("data", 4, Discipline::Shared);
        memory.assign_pointer(p1, Some(target)).unwrap();

        let p2 = memory.copy_shared(p1, "p2").unwrap();
        assert_eq!(memory.block(target).unwrap().ref_count(), Some(2));
        assert_eq!(memory.block(p2).unwrap().points_to(), Some(target));

        assert_eq!(memory.end_scope(), Some(p2));
        assert!(memory.block(target).unwrap().allocated);
        assert_eq!(memory.end_scope(), Some(p1));
        assert!(!memory.block(target).unwrap().allocated);

        let frees = memory
            .events()
            .iter()
            .filter(|e| e.block == target && e.kind == EventKind::Deallocate)
            .count();
        assert_eq!(frees, 1);
        assert!(memory.detect_leaks().is_empty());
    }

    #[test]
    fn test_copy_shared_requires_shared_source() {
        let mut memory = MemoryManager::new();
        let raw = memory.create_stack_pointer("raw", Discipline::Raw, None);
        assert_eq!(
            memory.copy_shared(raw, "copy"),
            Err(MemoryError::WrongDiscipline {
                id: raw,
                expected: Discipline::Shared
            })
        );
    }

    #[test]
    fn test_move_unique_transfers_without_ref_changes() {
        let mut memory = MemoryManager::new();
        let src = memory.create_stack_pointer("a", Discipline::Unique, None);
        let dst = memory.create_stack_pointer("b", Discipline::Unique, None);
        let target = memory.allocate_heap("data", 4, Discipline::Unique);
        memory.assign_pointer(src, Some(target)).unwrap();

        memory.move_unique(src, dst).unwrap();

        assert_eq!(memory.block(src).unwrap().points_to(), None);
        assert_eq!(memory.block(dst).unwrap().points_to(), Some(target));
        assert_eq!(memory.block(target).unwrap().ref_count(), None);
        assert!(memory.block(target).unwrap().allocated);
    }

    #[test]
    fn test_move_unique_rejects_mixed_disciplines() {
        let mut memory = MemoryManager::new();
        let src = memory.create_stack_pointer("a", Discipline::Unique, None);
        let dst = memory.create_stack_pointer("b", Discipline::Shared, None);
        assert!(matches!(
            memory.move_unique(src, dst),
            Err(MemoryError::WrongDiscipline { .. })
        ));
        assert_eq!(memory.move_unique(src, src), Err(MemoryError::SelfMove(src)));
    }

    #[test]
    fn test_end_scope_is_lifo_and_frees_unique_target() {
        let mut memory = MemoryManager::new();
        let x = memory.create_stack_variable("x", 4);
        let owner = memory.create_stack_pointer("owner", Discipline::Unique, None);
        let target = memory.allocate_heap("data", 4, Discipline::Unique);
        memory.assign_pointer(owner, Some(target)).unwrap();

        assert_eq!(memory.end_scope(), Some(owner));
        assert!(!memory.block(target).unwrap().allocated);
        assert_eq!(memory.end_scope(), Some(x));
        assert_eq!(memory.end_scope(), None);
        assert_eq!(memory.stack_depth(), 0);
    }

    #[test]
    fn test_leak_detection_ignores_smart_blocks() {
        let mut memory = MemoryManager::new();
        let raw = memory.allocate_heap("raw", 4, Discipline::Raw);
        memory.allocate_heap("unique", 4, Discipline::Unique);
        memory.allocate_heap("shared", 4, Discipline::Shared);
        assert_eq!(memory.detect_leaks(), vec![raw]);

        let leaks = memory.report_leaks();
        assert_eq!(leaks, vec![raw]);
        assert_eq!(memory.events().last().map(|e| e.kind), Some(EventKind::Leak));
    }

    #[test]
    fn test_dead_pointer_does_not_keep_block_alive() {
        let mut memory = MemoryManager::new();
        let (_ptr, heap) = raw_pointer_to_new_int(&mut memory, "p");
        assert!(memory.detect_leaks().is_empty());
        memory.end_scope();
        assert_eq!(memory.detect_leaks(), vec![heap]);
    }

    #[test]
    fn test_tick_ages_live_blocks() {
        let mut memory = MemoryManager::new();
        let a = memory.create_stack_variable("a", 4);
        let b = memory.create_stack_variable("b", 4);
        memory.tick();
        memory.end_scope();
        memory.tick();
        assert_eq!(memory.block(a).unwrap().lifetime, 2);
        assert_eq!(memory.block(b).unwrap().lifetime, 1);
        assert_eq!(memory.clock(), 2);
    }

    #[test]
    fn test_stats() {
        let mut memory = MemoryManager::new();
        memory.create_stack_variable("x", 4);
        memory.allocate_heap("leaked", 12, Discipline::Raw);
        let stats = memory.stats();
        assert_eq!(stats.live_blocks, 2);
        assert_eq!(stats.stack_bytes, 4);
        assert_eq!(stats.heap_bytes, 12);
        assert_eq!(stats.leaked_bytes, 12);
    }

    #[test]
    fn test_reset_restarts_ids() {
        let mut memory = MemoryManager::new();
        memory.create_stack_variable("x", 4);
        memory.allocate_heap("y", 4, Discipline::Raw);
        memory.reset();
        memory.reset();
        assert!(memory.blocks().is_empty());
        assert!(memory.events().is_empty());
        assert_eq!(memory.create_stack_variable("z", 4), 1);
    }
}
