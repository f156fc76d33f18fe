//! Per-kind slot/generation identifier allocator.

use std::collections::{HashMap, VecDeque};

use fusilli_types::{ComponentKind, Id};

#[derive(Debug, Default)]
struct SlotTracker {
    next_slot: u32,
    free: VecDeque<Id>,
}

/// Hands out identifiers per component kind, recycling freed slots.
///
/// A freed slot re-enters circulation with its generation bumped, so at most
/// one live identifier exists per `(kind, slot)` and generations per slot
/// strictly increase across the allocator's lifetime.
#[derive(Debug, Default)]
pub struct IdAllocator {
    kinds: HashMap<ComponentKind, SlotTracker>,
}

impl IdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identifier for a kind: a recycled slot if one is
    /// queued, otherwise a fresh slot at generation zero.
    pub fn allocate(&mut self, kind: ComponentKind) -> Id {
        let tracker = self.kinds.entry(kind).or_default();
        if let Some(id) = tracker.free.pop_front() {
            id
        } else {
            let id = Id::new(tracker.next_slot, 0);
            tracker.next_slot += 1;
            id
        }
    }

    /// Return an identifier to the pool with its generation bumped.
    pub fn release(&mut self, kind: ComponentKind, id: Id) {
        self.kinds
            .entry(kind)
            .or_default()
            .free
            .push_back(Id::new(id.slot, id.generation + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_allocation() {
        let mut allocator = IdAllocator::new();
        assert_eq!(allocator.allocate(ComponentKind::Table), Id::new(0, 0));
        assert_eq!(allocator.allocate(ComponentKind::Table), Id::new(1, 0));
        assert_eq!(allocator.allocate(ComponentKind::Table), Id::new(2, 0));
    }

    #[test]
    fn test_kinds_have_independent_slot_spaces() {
        let mut allocator = IdAllocator::new();
        assert_eq!(allocator.allocate(ComponentKind::Table), Id::new(0, 0));
        assert_eq!(allocator.allocate(ComponentKind::Light), Id::new(0, 0));
    }

    #[test]
    fn test_released_slot_returns_with_bumped_generation() {
        let mut allocator = IdAllocator::new();
        let first = allocator.allocate(ComponentKind::Entity);
        allocator.allocate(ComponentKind::Entity);
        allocator.release(ComponentKind::Entity, first);
        assert_eq!(allocator.allocate(ComponentKind::Entity), Id::new(0, 1));
        // Queue drained, back to fresh slots.
        assert_eq!(allocator.allocate(ComponentKind::Entity), Id::new(2, 0));
    }

    #[test]
    fn test_generations_strictly_increase_per_slot() {
        let mut allocator = IdAllocator::new();
        let mut generation = allocator.allocate(ComponentKind::Buffer).generation;
        for _ in 0..5 {
            allocator.release(ComponentKind::Buffer, Id::new(0, generation));
            let id = allocator.allocate(ComponentKind::Buffer);
            assert_eq!(id.slot, 0);
            assert!(id.generation > generation);
            generation = id.generation;
        }
    }

    #[test]
    fn test_free_queue_is_fifo() {
        let mut allocator = IdAllocator::new();
        let a = allocator.allocate(ComponentKind::Material);
        let b = allocator.allocate(ComponentKind::Material);
        allocator.release(ComponentKind::Material, a);
        allocator.release(ComponentKind::Material, b);
        assert_eq!(allocator.allocate(ComponentKind::Material), Id::new(0, 1));
        assert_eq!(allocator.allocate(ComponentKind::Material), Id::new(1, 1));
    }
}
