//! Fixed-capacity entity pools
//!
//! Entities are allocated once and recycled for the life of the simulation.
//! A [`Handle`] is an index plus a generation so a stale handle from a previous
//! occupant of the slot is detected instead of aliasing the new one.

use std::collections::VecDeque;

/// Handle to a pooled entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle {
    pub index: u32,
    pub generation: u32,
}

/// Per-class state stored in a pool slot
pub trait Poolable {
    /// Called when the slot goes back to the free list (hide, deactivate)
    fn reset(&mut self);
}

#[derive(Debug)]
struct Slot<T> {
    item: T,
    generation: u32,
    in_use: bool,
}

/// Fixed-size recycling allocator for one entity class
#[derive(Debug)]
pub struct Pool<T> {
    name: &'static str,
    slots: Vec<Slot<T>>,
    free: VecDeque<u32>,
}

impl<T: Poolable + Default> Pool<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                item: T::default(),
                generation: 0,
                in_use: false,
            })
            .collect();
        Self {
            name,
            slots,
            free: (0..capacity as u32).collect(),
        }
    }

    /// Take a free slot. `None` means the pool is exhausted and the spawn is skipped.
    pub fn request(&mut self) -> Option<Handle> {
        let Some(index) = self.free.pop_front() else {
            log::trace!("Pool '{}' exhausted ({} in use)", self.name, self.slots.len());
            return None;
        };
        let slot = &mut self.slots[index as usize];
        slot.in_use = true;
        Some(Handle {
            index,
            generation: slot.generation,
        })
    }

    /// Return a slot to the free list and reset its item.
    ///
    /// Panics on a handle that is not currently in use: releasing twice means
    /// two owners think they hold the same entity.
    pub fn release(&mut self, handle: Handle) {
        let name = self.name;
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .unwrap_or_else(|| panic!("pool '{name}': handle {handle:?} out of range"));
        assert!(
            slot.in_use && slot.generation == handle.generation,
            "pool '{name}': release of handle {handle:?} that is not in use"
        );
        slot.in_use = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.item.reset();
        self.free.push_back(handle.index);
    }

    /// Release every in-use slot
    pub fn release_all(&mut self) {
        for index in 0..self.slots.len() {
            let slot = &self.slots[index];
            if slot.in_use {
                let handle = Handle {
                    index: index as u32,
                    generation: slot.generation,
                };
                self.release(handle);
            }
        }
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.index as usize)
            .is_some_and(|s| s.in_use && s.generation == handle.generation)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.in_use && s.generation == handle.generation)
            .map(|s| &s.item)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.in_use && s.generation == handle.generation)
            .map(|s| &mut s.item)
    }

    /// Borrow an entity the caller knows is live (it came from the caller's own
    /// active list). Panics otherwise.
    pub fn live(&self, handle: Handle) -> &T {
        match self.get(handle) {
            Some(item) => item,
            None => panic!("pool '{}': handle {handle:?} is not live", self.name),
        }
    }

    pub fn live_mut(&mut self, handle: Handle) -> &mut T {
        let name = self.name;
        match self.get_mut(handle) {
            Some(item) => item,
            None => panic!("pool '{name}': handle {handle:?} is not live"),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn in_use_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Rock {
        visible: bool,
    }

    impl Poolable for Rock {
        fn reset(&mut self) {
            self.visible = false;
        }
    }

    #[test]
    fn test_request_until_exhausted() {
        let mut pool: Pool<Rock> = Pool::new("rocks", 3);
        let handles: Vec<_> = (0..3).map(|_| pool.request().unwrap()).collect();
        assert_eq!(pool.free_count(), 0);
        assert_eq!(pool.request(), None);
        pool.release(handles[1]);
        assert!(pool.request().is_some());
    }

    #[test]
    fn test_release_resets_item() {
        let mut pool: Pool<Rock> = Pool::new("rocks", 1);
        let h = pool.request().unwrap();
        pool.live_mut(h).visible = true;
        pool.release(h);
        let h2 = pool.request().unwrap();
        assert!(!pool.live(h2).visible);
    }

    #[test]
    fn test_stale_handle_is_not_live() {
        let mut pool: Pool<Rock> = Pool::new("rocks", 1);
        let h = pool.request().unwrap();
        pool.release(h);
        let h2 = pool.request().unwrap();
        assert_eq!(h.index, h2.index);
        assert!(!pool.is_live(h));
        assert!(pool.get(h).is_none());
        assert!(pool.is_live(h2));
    }

    #[test]
    #[should_panic(expected = "not in use")]
    fn test_double_release_panics() {
        let mut pool: Pool<Rock> = Pool::new("rocks", 2);
        let h = pool.request().unwrap();
        pool.release(h);
        pool.release(h);
    }

    #[test]
    fn test_release_all() {
        let mut pool: Pool<Rock> = Pool::new("rocks", 4);
        for _ in 0..3 {
            pool.request();
        }
        assert_eq!(pool.in_use_count(), 3);
        pool.release_all();
        assert_eq!(pool.free_count(), 4);
    }
}
