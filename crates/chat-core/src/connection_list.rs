//! Arena-backed ordered list of live connections.
//!
//! [`ConnectionList`] stores entries in a growable slot array. Vacant
//! slots are kept on a free-list and reused by later inserts, while an
//! index-linked doubly linked list threads through the occupied slots so
//! iteration always follows insertion order, even across slot reuse.
//!
//! Every slot carries a generation counter that is bumped on removal.
//! A [`Handle`] records the generation it was issued for, so a stale
//! handle (already removed, or pointing at a reused slot) simply misses
//! instead of detaching someone else's entry.
//!
//! This type is not synchronized; `chat-server` wraps it in a single
//! mutex so that insert, remove and iteration are mutually exclusive.

use crate::error::CoreError;

/// Stable reference to an entry returned by [`ConnectionList::push_back`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Slot index in the arena. Only meaningful for diagnostics.
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// What a [`ConnectionList::for_each`] visitor wants done with the entry
/// it was just given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Keep,
    Remove,
}

#[derive(Debug)]
struct Slot<C> {
    generation: u32,
    entry: Option<Linked<C>>,
}

#[derive(Debug)]
struct Linked<C> {
    value: C,
    prev: Option<u32>,
    next: Option<u32>,
}

/// Ordered collection with O(1) append and O(1) removal by handle.
#[derive(Debug)]
pub struct ConnectionList<C> {
    slots: Vec<Slot<C>>,
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl<C> Default for ConnectionList<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ConnectionList<C> {
    pub fn new() -> Self {
        ConnectionList {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `value` at the tail.
    ///
    /// Fails with [`CoreError::OutOfMemory`] only when the arena cannot
    /// grow; the value is dropped in that case.
    pub fn push_back(&mut self, value: C) -> Result<Handle, CoreError> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                if self.slots.len() >= u32::MAX as usize {
                    return Err(CoreError::OutOfMemory);
                }
                self.slots
                    .try_reserve(1)
                    .map_err(|_| CoreError::OutOfMemory)?;
                self.slots.push(Slot {
                    generation: 0,
                    entry: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let prev = self.tail;
        let slot = &mut self.slots[index as usize];
        slot.entry = Some(Linked {
            value,
            prev,
            next: None,
        });
        let generation = slot.generation;

        match prev {
            Some(tail) => self.link_mut(tail).next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;

        Ok(Handle { index, generation })
    }

    /// Detach the entry behind `handle`.
    ///
    /// Returns `None` for a stale handle, which makes a second removal of
    /// the same handle a no-op.
    pub fn remove(&mut self, handle: Handle) -> Option<C> {
        if !self.contains(handle) {
            return None;
        }
        self.unlink(handle.index)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.index as usize)
            .map_or(false, |slot| {
                slot.generation == handle.generation && slot.entry.is_some()
            })
    }

    pub fn get(&self, handle: Handle) -> Option<&C> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref().map(|linked| &linked.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut C> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_mut().map(|linked| &mut linked.value)
    }

    /// Handle of the oldest entry.
    pub fn first(&self) -> Option<Handle> {
        self.head.map(|index| self.handle_at(index))
    }

    /// Handle of the entry inserted right after `handle`, skipping removed
    /// ones. Capture it before removing `handle` when walking manually.
    pub fn next_after(&self, handle: Handle) -> Option<Handle> {
        if !self.contains(handle) {
            return None;
        }
        self.slots[handle.index as usize]
            .entry
            .as_ref()
            .and_then(|linked| linked.next)
            .map(|index| self.handle_at(index))
    }

    /// Visit every entry in insertion order. The visitor may ask for the
    /// current entry to be removed; the walk continues with its successor.
    pub fn for_each<F>(&mut self, mut visit: F)
    where
        F: FnMut(Handle, &mut C) -> Visit,
    {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let handle = self.handle_at(index);
            let linked = self.link_mut(index);
            cursor = linked.next;
            if visit(handle, &mut linked.value) == Visit::Remove {
                self.unlink(index);
            }
        }
    }

    /// Iterate over `(handle, &value)` in insertion order.
    pub fn iter(&self) -> Iter<'_, C> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Remove every entry, returning them in insertion order.
    pub fn drain(&mut self) -> Vec<C> {
        let mut values = Vec::with_capacity(self.len);
        while let Some(index) = self.head {
            if let Some(value) = self.unlink(index) {
                values.push(value);
            }
        }
        values
    }

    fn handle_at(&self, index: u32) -> Handle {
        Handle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    // Callers only pass indices that are currently linked.
    fn link_mut(&mut self, index: u32) -> &mut Linked<C> {
        match self.slots[index as usize].entry.as_mut() {
            Some(linked) => linked,
            None => unreachable!("linked index {index} points at a vacant slot"),
        }
    }

    fn unlink(&mut self, index: u32) -> Option<C> {
        let slot = &mut self.slots[index as usize];
        let Linked { value, prev, next } = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);

        match prev {
            Some(prev) => self.link_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.link_mut(next).prev = prev,
            None => self.tail = prev,
        }

        self.free.push(index);
        self.len -= 1;
        Some(value)
    }
}

/// Insertion-order iterator returned by [`ConnectionList::iter`].
pub struct Iter<'a, C> {
    list: &'a ConnectionList<C>,
    cursor: Option<u32>,
}

impl<'a, C> Iterator for Iter<'a, C> {
    type Item = (Handle, &'a C);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let slot = &self.list.slots[index as usize];
        let linked = slot.entry.as_ref()?;
        self.cursor = linked.next;
        Some((
            Handle {
                index,
                generation: slot.generation,
            },
            &linked.value,
        ))
    }
}
