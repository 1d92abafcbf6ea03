//! Fiber Arena - Handle allocation for fiber records.
//!
//! Manages the lifecycle of fiber slots:
//! - Free slot pool for O(1) reuse
//! - Generation counters so handles to released fibers stop resolving
//! - Subtree walks and root lookup over `child`/`sibling`/`parent` links

use super::fiber::Fiber;

// =============================================================================
// Handles
// =============================================================================

/// Stable handle to a fiber record.
///
/// A handle resolves only while the fiber it was issued for is alive.
/// Once the slot is released and reused, old handles fail lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FiberId {
    index: u32,
    generation: u32,
}

impl FiberId {
    pub fn index(self) -> u32 {
        self.index
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    fiber: Option<Fiber>,
}

// =============================================================================
// Arena
// =============================================================================

/// Storage for every fiber of every tree a reconciler owns.
#[derive(Debug, Default)]
pub struct FiberArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl FiberArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fiber and return its handle.
    pub fn insert(&mut self, fiber: Fiber) -> FiberId {
        self.live += 1;

        // Reuse free slot or allocate new
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.fiber = Some(fiber);
            return FiberId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            fiber: Some(fiber),
        });
        FiberId {
            index,
            generation: 0,
        }
    }

    /// Release a fiber. Its handle (and every copy of it) stops resolving.
    pub fn remove(&mut self, id: FiberId) -> Option<Fiber> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let fiber = slot.fiber.take()?;

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(fiber)
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.fiber.as_ref()
    }

    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.fiber.as_mut()
    }

    pub fn contains(&self, id: FiberId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live fibers.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    // =========================================================================
    // Tree Walks
    // =========================================================================

    /// Topmost fiber reachable from `id` through `parent` links.
    pub fn root_of(&self, id: FiberId) -> Option<FiberId> {
        let mut node = id;
        loop {
            match self.get(node)?.parent {
                Some(parent) => node = parent,
                None => return Some(node),
            }
        }
    }

    /// Children of `id`, left to right.
    pub fn children(&self, id: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        let mut next = self.get(id).and_then(|f| f.child);
        while let Some(child) = next {
            out.push(child);
            next = self.get(child).and_then(|f| f.sibling);
        }
        out
    }

    /// `root` and all of its descendants, depth-first pre-order.
    ///
    /// Follows `child`/`sibling` links only, so it never escapes the subtree
    /// through `root`'s own siblings.
    pub fn subtree(&self, root: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !self.contains(id) {
                continue;
            }
            out.push(id);
            let children = self.children(id);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Release `root` and every descendant. Returns how many were released.
    pub fn remove_subtree(&mut self, root: FiberId) -> usize {
        let ids = self.subtree(root);
        for &id in &ids {
            self.remove(id);
        }
        ids.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
