//! Simulated allocation records
//!
//! A [`MemoryBlock`] is one stack slot or heap allocation. Instead of a flat record
//! with flags that are only meaningful in some combinations, a block is described by
//! two orthogonal sum types:
//!
//! - [`Storage`]: where the block lives and, for heap blocks, which ownership
//!   discipline manages it (the shared reference count lives here)
//! - [`Content`]: what the block holds: a plain value, a class instance, or a pointer
//!
//! Pointers refer to their pointee by [`BlockId`], never by reference. A pointee that
//! has been freed simply stops resolving to a live block, which is exactly the
//! dangling-pointer situation the simulator needs to show.

use std::fmt;
use std::rc::Rc;

/// Unique block identifier, monotonic within a session and never reused
pub type BlockId = u32;

/// Synthetic display address
pub type Address = u64;

/// Ownership policy attached to a pointer or to the heap block it manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discipline {
    /// Manual `new`/`delete`
    Raw,
    /// `unique_ptr`: exclusive, movable
    Unique,
    /// `shared_ptr`: reference counted
    Shared,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::Raw => write!(f, "raw pointer"),
            Discipline::Unique => write!(f, "unique_ptr"),
            Discipline::Shared => write!(f, "shared_ptr"),
        }
    }
}

/// Storage class as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Stack,
    Heap,
    SmartManagedHeap,
}

/// Where a block lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// Stack slot with its logical position (stack depth at creation)
    Stack { slot: usize },
    /// Heap allocation owned manually through raw pointers
    Heap,
    /// Heap allocation owned by a `unique_ptr`
    UniqueHeap,
    /// Heap allocation owned by one or more `shared_ptr`s
    SharedHeap { ref_count: usize },
}

impl Storage {
    pub fn class(&self) -> StorageClass {
        match self {
            Storage::Stack { .. } => StorageClass::Stack,
            Storage::Heap => StorageClass::Heap,
            Storage::UniqueHeap | Storage::SharedHeap { .. } => StorageClass::SmartManagedHeap,
        }
    }

    /// Heap storage for an allocation made under `discipline`
    pub fn heap_for(discipline: Discipline) -> Self {
        match discipline {
            Discipline::Raw => Storage::Heap,
            Discipline::Unique => Storage::UniqueHeap,
            Discipline::Shared => Storage::SharedHeap { ref_count: 1 },
        }
    }
}

/// Pointer metadata for blocks that hold a pointer
#[derive(Debug, Clone, PartialEq)]
pub struct PointerSlot {
    pub discipline: Discipline,
    pub points_to: Option<BlockId>,
    /// Class of the pointee, when the pointer was declared as `Class*`
    pub pointee_class: Option<Rc<ClassLayout>>,
}

/// What a block holds
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Content {
    #[default]
    Value,
    Object(Rc<ClassLayout>),
    Pointer(PointerSlot),
}

/// A simulated allocation
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryBlock {
    pub id: BlockId,
    pub name: String,
    pub size: usize,
    pub address: Address,
    pub storage: Storage,
    pub content: Content,
    pub allocated: bool,
    /// Number of logical clock ticks this block has been alive
    pub lifetime: u64,
}

impl MemoryBlock {
    /// Discipline under which the allocation itself is managed
    ///
    /// Stack blocks and manual heap blocks report [`Discipline::Raw`].
    pub fn discipline(&self) -> Discipline {
        match self.storage {
            Storage::UniqueHeap => Discipline::Unique,
            Storage::SharedHeap { .. } => Discipline::Shared,
            Storage::Stack { .. } | Storage::Heap => Discipline::Raw,
        }
    }

    /// Shared reference count, only defined for shared-managed heap blocks
    pub fn ref_count(&self) -> Option<usize> {
        match self.storage {
            Storage::SharedHeap { ref_count } => Some(ref_count),
            _ => None,
        }
    }

    pub fn is_stack(&self) -> bool {
        matches!(self.storage, Storage::Stack { .. })
    }

    pub fn is_heap(&self) -> bool {
        !self.is_stack()
    }

    pub fn is_object(&self) -> bool {
        matches!(self.content, Content::Object(_))
    }

    pub fn pointer(&self) -> Option<&PointerSlot> {
        match &self.content {
            Content::Pointer(slot) => Some(slot),
            _ => None,
        }
    }

    pub fn pointer_mut(&mut self) -> Option<&mut PointerSlot> {
        match &mut self.content {
            Content::Pointer(slot) => Some(slot),
            _ => None,
        }
    }

    /// Target of this block when it is a pointer
    pub fn points_to(&self) -> Option<BlockId> {
        self.pointer().and_then(|p| p.points_to)
    }

    /// Class layout of the instance this block holds or points at
    pub fn class_layout(&self) -> Option<&Rc<ClassLayout>> {
        match &self.content {
            Content::Object(layout) => Some(layout),
            Content::Pointer(slot) => slot.pointee_class.as_ref(),
            Content::Value => None,
        }
    }
}

/// One member of a class layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub type_name: String,
    pub size: usize,
}

/// Named record type descriptor
///
/// `total_size` is kept equal to the sum of member sizes as members are appended.
/// Once the definition is closed the layout is shared behind an `Rc` and never
/// mutated again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassLayout {
    pub name: String,
    pub members: Vec<Member>,
    pub total_size: usize,
    pub has_constructor: bool,
    pub has_destructor: bool,
}

impl ClassLayout {
    pub fn new(name: impl Into<String>) -> Self {
        ClassLayout {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a member and grow the total size
    pub fn push_member(&mut self, name: impl Into<String>, type_name: impl Into<String>, size: usize) {
        self.members.push(Member {
            name: name.into(),
            type_name: type_name.into(),
            size,
        });
        self.total_size = self.total_size.saturating_add(size);
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}
