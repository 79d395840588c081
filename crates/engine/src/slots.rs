//! Arena of reusable display slots with a generation per slot.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SlotId(u32);

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    bound: Option<usize>,
    live: bool,
}

#[derive(Debug, Default)]
pub struct SlotTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl SlotTable {
    pub fn new() -> Self { Self::default() }

    pub fn acquire(&mut self) -> SlotId {
        if let Some(i) = self.free.pop() {
            self.slots[i as usize].live = true;
            return SlotId(i);
        }
        self.slots.push(Slot { generation: 0, bound: None, live: true });
        SlotId((self.slots.len() - 1) as u32)
    }

    fn slot_mut(&mut self, id: SlotId) -> Option<&mut Slot> {
        self.slots.get_mut(id.0 as usize).filter(|s| s.live)
    }

    /// Point `id` at `index` (or nothing), bumping its generation.
    /// Returns the new generation and the previous binding.
    pub fn rebind(&mut self, id: SlotId, index: Option<usize>) -> Option<(u64, Option<usize>)> {
        let slot = self.slot_mut(id)?;
        slot.generation += 1;
        let previous = std::mem::replace(&mut slot.bound, index);
        Some((slot.generation, previous))
    }

    /// Unbind and return the slot to the free list; returns the previous binding.
    pub fn release(&mut self, id: SlotId) -> Option<usize> {
        let (_, previous) = self.rebind(id, None)?;
        if let Some(slot) = self.slot_mut(id) {
            slot.live = false;
        }
        self.free.push(id.0);
        previous
    }

    pub fn bound(&self, id: SlotId) -> Option<usize> {
        self.slots.get(id.0 as usize).filter(|s| s.live).and_then(|s| s.bound)
    }

    pub fn is_current(&self, id: SlotId, generation: u64) -> bool {
        self.slots.get(id.0 as usize).map(|s| s.live && s.generation == generation).unwrap_or(false)
    }

    /// Some slot other than `except` that displays `index`, with its generation.
    pub fn holder_of(&self, index: usize, except: SlotId) -> Option<(SlotId, u64)> {
        self.slots
            .iter()
            .enumerate()
            .find(|(i, s)| *i as u32 != except.0 && s.live && s.bound == Some(index))
            .map(|(i, s)| (SlotId(i as u32), s.generation))
    }

    /// Unbind every live slot (the feed was replaced underneath them).
    pub fn unbind_all(&mut self) -> usize {
        let mut n = 0;
        for s in self.slots.iter_mut().filter(|s| s.live) {
            s.generation += 1;
            if s.bound.take().is_some() {
                n += 1;
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_increase_on_every_rebind() {
        let mut t = SlotTable::new();
        let s = t.acquire();
        let (g1, prev) = t.rebind(s, Some(3)).unwrap();
        assert_eq!(prev, None);
        let (g2, prev) = t.rebind(s, Some(4)).unwrap();
        assert_eq!(prev, Some(3));
        assert!(g2 > g1);
        assert!(!t.is_current(s, g1));
        assert!(t.is_current(s, g2));
    }

    #[test]
    fn released_slot_is_reused_with_fresh_generation() {
        let mut t = SlotTable::new();
        let s = t.acquire();
        let (g, _) = t.rebind(s, Some(0)).unwrap();
        assert_eq!(t.release(s), Some(0));
        assert!(!t.is_current(s, g));
        assert!(t.rebind(s, Some(1)).is_none());
        let again = t.acquire();
        assert_eq!(again, s);
        let (g2, prev) = t.rebind(again, Some(1)).unwrap();
        assert!(g2 > g);
        assert_eq!(prev, None);
    }

    #[test]
    fn unbind_all_invalidates() {
        let mut t = SlotTable::new();
        let a = t.acquire();
        let b = t.acquire();
        let (ga, _) = t.rebind(a, Some(0)).unwrap();
        let (gb, _) = t.rebind(b, Some(0)).unwrap();
        assert_eq!(t.holder_of(0, a), Some((b, gb)));
        assert_eq!(t.holder_of(1, a), None);
        assert_eq!(t.unbind_all(), 2);
        assert!(!t.is_current(a, ga));
        assert_eq!(t.bound(a), None);
        assert_eq!(t.holder_of(0, a), None);
    }
}
