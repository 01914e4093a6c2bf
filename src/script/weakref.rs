//! Weak references through a context-owned indirection arena.
//!
//! A handle is a (slot, generation) pair. Invalidation bumps the slot's
//! generation, so every outstanding handle for the old generation resolves
//! to absent instead of a stale value. Freed slots are reused through a
//! free list.

use crate::script::value::Value;

/// Copyable handle into a context's weak-reference arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeakHandle {
    slot: u32,
    generation: u32,
}

impl WeakHandle {
    /// Arena slot index this handle points at.
    pub fn slot(self) -> u32 {
        self.slot
    }

    /// Generation the handle was issued with.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct WeakSlot {
    generation: u32,
    value: Option<Value>,
}

/// Arena of weakly-referenced values with generation-checked access.
///
/// The arena holds the strong reference; the value's lifetime is exactly the
/// span between [`WeakTable::insert`] and [`WeakTable::clear`].
#[derive(Debug, Default)]
pub struct WeakTable {
    slots: Vec<WeakSlot>,
    free_list: Vec<u32>,
}

impl WeakTable {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` and returns a handle for indirect access.
    pub fn insert(&mut self, value: Value) -> WeakHandle {
        if let Some(slot) = self.free_list.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.value = Some(value);
            WeakHandle {
                slot,
                generation: entry.generation,
            }
        } else {
            let slot = self.slots.len() as u32;
            self.slots.push(WeakSlot {
                generation: 0,
                value: Some(value),
            });
            WeakHandle {
                slot,
                generation: 0,
            }
        }
    }

    /// Resolves a handle. Stale or cleared handles yield `None`, never a
    /// stale value.
    pub fn get(&self, handle: WeakHandle) -> Option<&Value> {
        let entry = self.slots.get(handle.slot as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        entry.value.as_ref()
    }

    /// Invalidates a handle, releasing the held value.
    ///
    /// Idempotent: clearing an already-stale handle returns `false` and has
    /// no effect, so multiple holders may all attempt the clear.
    pub fn clear(&mut self, handle: WeakHandle) -> bool {
        let Some(entry) = self.slots.get_mut(handle.slot as usize) else {
            return false;
        };
        if entry.generation != handle.generation || entry.value.is_none() {
            return false;
        }
        entry.value = None;
        entry.generation = entry.generation.wrapping_add(1);
        self.free_list.push(handle.slot);
        true
    }

    /// Number of live (uncleared) entries.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.value.is_some()).count()
    }
}
