use crate::core::{BodyHandle, ConstraintHandle};
use crate::error::PhysicsError;
use crate::Result;

/// Generic storage trait for physics objects
pub trait Storage<T, H> {
    /// Creates a new empty storage
    fn new() -> Self;

    /// Adds an item to the storage and returns its handle
    fn add(&mut self, item: T) -> H;

    /// Gets a reference to an item by its handle
    fn get(&self, handle: H) -> Option<&T>;

    /// Gets a mutable reference to an item by its handle
    fn get_mut(&mut self, handle: H) -> Option<&mut T>;

    /// Removes an item from the storage
    fn remove(&mut self, handle: H) -> Option<T>;

    /// Returns the number of items in the storage
    fn len(&self) -> usize;

    /// Returns whether the storage is empty
    fn is_empty(&self) -> bool;

    /// Clears all items from the storage, invalidating every handle
    fn clear(&mut self);

    /// Returns all live handles in registration order
    fn handles(&self) -> Vec<H>;
}

/// A slot in the handle indirection table
#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u32,
    index: Option<usize>,
}

/// Generation-validated arena with densely packed items
///
/// Items stay contiguous and in registration order; handles resolve through a
/// slot table so they survive the removal of unrelated items. Removing an item
/// bumps its slot generation, so stale handles fail validation instead of
/// aliasing a newer item.
#[derive(Debug, Default)]
struct GenArena<T> {
    items: Vec<T>,
    slot_of: Vec<u32>,
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl<T> GenArena<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            slot_of: Vec::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    fn add(&mut self, item: T) -> (u32, u32) {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    index: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        self.slots[slot as usize].index = Some(self.items.len());
        self.items.push(item);
        self.slot_of.push(slot);
        (slot, self.slots[slot as usize].generation)
    }

    fn resolve(&self, slot: u32, generation: u32) -> Option<usize> {
        let entry = self.slots.get(slot as usize)?;
        if entry.generation != generation {
            return None;
        }
        entry.index
    }

    fn remove(&mut self, slot: u32, generation: u32) -> Option<T> {
        let index = self.resolve(slot, generation)?;
        let item = self.items.remove(index);
        self.slot_of.remove(index);

        // Items after the removed one shift down by one.
        for dense in index..self.items.len() {
            self.slots[self.slot_of[dense] as usize].index = Some(dense);
        }

        let entry = &mut self.slots[slot as usize];
        entry.generation = entry.generation.wrapping_add(1);
        entry.index = None;
        self.free.push(slot);
        Some(item)
    }

    fn clear(&mut self) {
        self.items.clear();
        self.slot_of.clear();
        self.free.clear();
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            entry.generation = entry.generation.wrapping_add(1);
            entry.index = None;
            self.free.push(slot as u32);
        }
    }

    fn handle_at(&self, index: usize) -> (u32, u32) {
        let slot = self.slot_of[index];
        (slot, self.slots[slot as usize].generation)
    }
}

/// Storage for rigid bodies
///
/// Bodies stay densely packed in registration order; the dense index is the
/// body's position in the flat state vector.
#[derive(Debug, Default)]
pub struct BodyStorage<T> {
    arena: GenArena<T>,
}

impl<T> Storage<T, BodyHandle> for BodyStorage<T> {
    fn new() -> Self {
        Self {
            arena: GenArena::with_capacity(0),
        }
    }

    fn add(&mut self, item: T) -> BodyHandle {
        let (slot, generation) = self.arena.add(item);
        BodyHandle { slot, generation }
    }

    fn get(&self, handle: BodyHandle) -> Option<&T> {
        self.index_of(handle).map(|i| &self.arena.items[i])
    }

    fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut T> {
        let index = self.index_of(handle)?;
        Some(&mut self.arena.items[index])
    }

    fn remove(&mut self, handle: BodyHandle) -> Option<T> {
        self.arena.remove(handle.slot, handle.generation)
    }

    fn len(&self) -> usize {
        self.arena.items.len()
    }

    fn is_empty(&self) -> bool {
        self.arena.items.is_empty()
    }

    fn clear(&mut self) {
        self.arena.clear();
    }

    fn handles(&self) -> Vec<BodyHandle> {
        (0..self.len()).map(|i| self.handle_at(i)).collect()
    }
}

impl<T> BodyStorage<T> {
    /// Creates an empty storage with room for `capacity` bodies
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: GenArena::with_capacity(capacity),
        }
    }

    /// Returns true if the handle refers to a live body
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.index_of(handle).is_some()
    }

    /// Resolves a handle to the body's dense index in the flat state layout
    pub fn index_of(&self, handle: BodyHandle) -> Option<usize> {
        self.arena.resolve(handle.slot, handle.generation)
    }

    /// Returns the handle of the body at the given dense index
    pub fn handle_at(&self, index: usize) -> BodyHandle {
        let (slot, generation) = self.arena.handle_at(index);
        BodyHandle { slot, generation }
    }

    /// Returns the bodies as a dense slice in registration order
    pub fn as_slice(&self) -> &[T] {
        &self.arena.items
    }

    /// Returns the bodies as a mutable dense slice in registration order
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.arena.items
    }

    /// Returns an iterator over handles and bodies in registration order
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &T)> + '_ {
        self.arena
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (self.handle_at(i), item))
    }

    /// Gets a body by its handle, returning an error if the handle is stale
    pub fn get_body(&self, handle: BodyHandle) -> Result<&T> {
        self.get(handle).ok_or_else(|| {
            PhysicsError::HandleInvalidated(format!("body handle {:?} is stale", handle))
        })
    }

    /// Gets a mutable reference to a body, returning an error if the handle is stale
    pub fn get_body_mut(&mut self, handle: BodyHandle) -> Result<&mut T> {
        self.get_mut(handle).ok_or_else(|| {
            PhysicsError::HandleInvalidated(format!("body handle {:?} is stale", handle))
        })
    }
}

/// Storage for constraints
///
/// Registration order is preserved and defines the row ordering of the
/// constraint Jacobian.
#[derive(Debug, Default)]
pub struct ConstraintStorage<T> {
    arena: GenArena<T>,
}

impl<T> Storage<T, ConstraintHandle> for ConstraintStorage<T> {
    fn new() -> Self {
        Self {
            arena: GenArena::with_capacity(0),
        }
    }

    fn add(&mut self, item: T) -> ConstraintHandle {
        let (slot, generation) = self.arena.add(item);
        ConstraintHandle { slot, generation }
    }

    fn get(&self, handle: ConstraintHandle) -> Option<&T> {
        self.arena
            .resolve(handle.slot, handle.generation)
            .map(|i| &self.arena.items[i])
    }

    fn get_mut(&mut self, handle: ConstraintHandle) -> Option<&mut T> {
        let index = self.arena.resolve(handle.slot, handle.generation)?;
        Some(&mut self.arena.items[index])
    }

    fn remove(&mut self, handle: ConstraintHandle) -> Option<T> {
        self.arena.remove(handle.slot, handle.generation)
    }

    fn len(&self) -> usize {
        self.arena.items.len()
    }

    fn is_empty(&self) -> bool {
        self.arena.items.is_empty()
    }

    fn clear(&mut self) {
        self.arena.clear();
    }

    fn handles(&self) -> Vec<ConstraintHandle> {
        (0..self.len())
            .map(|i| {
                let (slot, generation) = self.arena.handle_at(i);
                ConstraintHandle { slot, generation }
            })
            .collect()
    }
}

impl<T> ConstraintStorage<T> {
    /// Creates an empty storage with room for `capacity` constraints
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: GenArena::with_capacity(capacity),
        }
    }

    /// Returns the constraints as a dense slice in registration order
    pub fn as_slice(&self) -> &[T] {
        &self.arena.items
    }

    /// Returns an iterator over handles and constraints in registration order
    pub fn iter(&self) -> impl Iterator<Item = (ConstraintHandle, &T)> + '_ {
        self.arena.items.iter().enumerate().map(|(i, item)| {
            let (slot, generation) = self.arena.handle_at(i);
            (ConstraintHandle { slot, generation }, item)
        })
    }

    /// Removes every constraint matched by the predicate
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut keep: F) {
        let stale: Vec<ConstraintHandle> = self
            .iter()
            .filter(|(_, item)| !keep(item))
            .map(|(handle, _)| handle)
            .collect();
        for handle in stale {
            self.remove(handle);
        }
    }

    /// Gets a constraint by its handle, returning an error if the handle is stale
    pub fn get_constraint(&self, handle: ConstraintHandle) -> Result<&T> {
        self.get(handle).ok_or_else(|| {
            PhysicsError::HandleInvalidated(format!("constraint handle {:?} is stale", handle))
        })
    }
}
