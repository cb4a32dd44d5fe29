use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::Tick;

/// Tick-indexed storage. Slots are contiguous from `start`, so lookups are an
/// index computation rather than a map probe, and every stored value is owned
/// by exactly one slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickBuffer<T> {
    start: Tick,
    slots: VecDeque<Option<T>>,
}

impl<T> Default for TickBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TickBuffer<T> {
    pub fn new() -> Self {
        Self {
            start: 0,
            slots: VecDeque::new(),
        }
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn first_tick(&self) -> Option<Tick> {
        self.iter().next().map(|(tick, _)| tick)
    }

    pub fn last_tick(&self) -> Option<Tick> {
        self.iter().next_back().map(|(tick, _)| tick)
    }

    pub fn contains(&self, tick: Tick) -> bool {
        self.get(tick).is_some()
    }

    pub fn get(&self, tick: Tick) -> Option<&T> {
        let index = self.index_of(tick)?;
        self.slots.get(index)?.as_ref()
    }

    pub fn get_mut(&mut self, tick: Tick) -> Option<&mut T> {
        let index = self.index_of(tick)?;
        self.slots.get_mut(index)?.as_mut()
    }

    /// Stores `item` at `tick`, returning whatever was there before.
    pub fn insert(&mut self, tick: Tick, item: T) -> Option<T> {
        let index = self.reserve(tick);
        self.slots[index].replace(item)
    }

    /// Returns the entry at `tick`, storing `make()` there first if it is empty.
    pub fn get_or_insert_with<F: FnOnce() -> T>(&mut self, tick: Tick, make: F) -> &mut T {
        let index = self.reserve(tick);
        self.slots[index].get_or_insert_with(make)
    }

    pub fn remove(&mut self, tick: Tick) -> Option<T> {
        let index = self.index_of(tick)?;
        let removed = self.slots.get_mut(index)?.take();
        self.shrink();
        removed
    }

    /// Finds the latest occupied tick at or before `tick`, scanning from the back.
    pub fn latest_at_or_before(&self, tick: Tick) -> Option<(Tick, &T)> {
        if self.slots.is_empty() || tick < self.start {
            return None;
        }

        let last_index = self.slots.len() - 1;
        let mut index = usize::try_from(tick - self.start)
            .map_or(last_index, |index| index.min(last_index));

        loop {
            if let Some(Some(item)) = self.slots.get(index) {
                return Some((self.start + index as Tick, item));
            }
            if index == 0 {
                // made it all the way through
                return None;
            }
            index -= 1;
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Tick, &T)> {
        let start = self.start;
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.as_ref().map(|item| (start + index as Tick, item))
            })
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain<F: FnMut(Tick, &T) -> bool>(&mut self, mut keep: F) {
        let start = self.start;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let drop_slot = match slot {
                Some(item) => !keep(start + index as Tick, item),
                None => false,
            };
            if drop_slot {
                *slot = None;
            }
        }
        self.shrink();
    }

    /// Drops every entry strictly before `tick`.
    pub fn prune_before(&mut self, tick: Tick) {
        while self.start < tick && !self.slots.is_empty() {
            self.slots.pop_front();
            self.start += 1;
        }
        self.shrink();
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.start = 0;
    }

    // Grows the arena so that `tick` has a slot, returning its index
    fn reserve(&mut self, tick: Tick) -> usize {
        if self.slots.is_empty() {
            self.start = tick;
        }

        while tick < self.start {
            self.slots.push_front(None);
            self.start -= 1;
        }

        let index = (tick - self.start) as usize;
        while self.slots.len() <= index {
            self.slots.push_back(None);
        }
        index
    }

    fn index_of(&self, tick: Tick) -> Option<usize> {
        if tick < self.start {
            return None;
        }
        let index = usize::try_from(tick - self.start).ok()?;
        (index < self.slots.len()).then_some(index)
    }

    // Empty slots at either end carry no information
    fn shrink(&mut self) {
        while let Some(None) = self.slots.back() {
            self.slots.pop_back();
        }
        while let Some(None) = self.slots.front() {
            self.slots.pop_front();
            self.start += 1;
        }
        if self.slots.is_empty() {
            self.start = 0;
        }
    }
}
