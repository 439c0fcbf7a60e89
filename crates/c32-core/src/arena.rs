//! Generation-checked slot storage.
//!
//! Every entity the wire protocol can address lives in an arena. A removed
//! slot bumps its generation, so handles that outlive their entity fail
//! lookup instead of aliasing whatever reuses the slot.

use core::marker::PhantomData;

use crate::error::{CoreError, CoreResult};
use crate::ids::{EntityId, Handle, MAX_SLOT};

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug, Clone)]
pub struct Arena<I, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    _id: PhantomData<I>,
}

impl<I: EntityId, T> Arena<I, T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _id: PhantomData,
        }
    }

    /// Maximum number of live entries.
    pub const fn capacity_limit() -> usize {
        MAX_SLOT as usize + 1
    }

    pub fn insert(&mut self, value: T) -> CoreResult<I> {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                if self.slots.len() >= Self::capacity_limit() {
                    return Err(CoreError::CapacityExhausted {
                        what: I::KIND.name(),
                        limit: Self::capacity_limit(),
                    });
                }
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let entry = &mut self.slots[slot as usize];
        entry.value = Some(value);
        self.len += 1;
        let handle = Handle::new(I::KIND, slot, entry.generation);
        Ok(I::from_handle(handle).expect("handle built with the arena's kind"))
    }

    fn slot_of(&self, id: I) -> Option<usize> {
        let handle = id.handle();
        let index = handle.slot() as usize;
        let slot = self.slots.get(index)?;
        (slot.generation == handle.generation() && slot.value.is_some()).then_some(index)
    }

    pub fn contains(&self, id: I) -> bool {
        self.slot_of(id).is_some()
    }

    pub fn get(&self, id: I) -> Option<&T> {
        let index = self.slot_of(id)?;
        self.slots[index].value.as_ref()
    }

    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        let index = self.slot_of(id)?;
        self.slots[index].value.as_mut()
    }

    /// Look up an entry, reporting a stale handle as an error.
    pub fn try_get(&self, id: I) -> CoreResult<&T> {
        self.get(id).ok_or(CoreError::StaleHandle {
            handle: id.handle(),
        })
    }

    pub fn try_get_mut(&mut self, id: I) -> CoreResult<&mut T> {
        self.get_mut(id).ok_or(CoreError::StaleHandle {
            handle: id.handle(),
        })
    }

    pub fn remove(&mut self, id: I) -> Option<T> {
        let index = self.slot_of(id)?;
        let slot = &mut self.slots[index];
        let value = slot.value.take();
        // 12-bit generation; wrapping is accepted
        slot.generation = (slot.generation + 1) & 0x0FFF;
        self.free.push(index as u32);
        self.len -= 1;
        value
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let value = slot.value.as_ref()?;
            let handle = Handle::new(I::KIND, index as u32, slot.generation);
            Some((I::from_handle(handle)?, value))
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = I> + '_ {
        self.iter().map(|(id, _)| id)
    }
}

impl<I: EntityId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}
