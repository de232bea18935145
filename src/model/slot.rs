use std::collections::HashMap;
use std::fmt;

use crate::common::error::{Error, Result};

/// A window number as assigned by the window manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(pub u32);

impl Slot {
    pub fn next(self) -> Result<Slot> {
        self.offset(1)
    }

    pub fn offset(self, by: u32) -> Result<Slot> {
        self.0
            .checked_add(by)
            .map(Slot)
            .ok_or_else(|| Error::Invariant(format!("slot {self} + {by} overflows")))
    }

    /// The slot a window at list position `position` gets when renumbered
    /// sequentially.
    pub fn at_position(position: usize) -> Result<Slot> {
        u32::try_from(position)
            .map(Slot)
            .map_err(|_| Error::Invariant(format!("position {position} has no slot number")))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The ordered set of occupied slots at one point in time.
///
/// Slots are strictly ascending and the snapshot is never empty; both are
/// checked on construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotSnapshot {
    slots: Vec<Slot>,
    index_of: HashMap<Slot, usize>,
}

impl SlotSnapshot {
    pub fn new(slots: Vec<Slot>) -> Result<Self> {
        if slots.is_empty() {
            return Err(Error::Invariant(
                "no managed windows; an empty window list is not supported".into(),
            ));
        }
        if let Some(pair) = slots.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(Error::Protocol(format!(
                "window list is not strictly ascending ({} then {})",
                pair[0], pair[1]
            )));
        }
        let index_of = slots.iter().enumerate().map(|(idx, slot)| (*slot, idx)).collect();
        Ok(Self { slots, index_of })
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn first(&self) -> Slot {
        self.slots[0]
    }

    pub fn last(&self) -> Slot {
        self.slots[self.slots.len() - 1]
    }

    pub fn get(&self, index: usize) -> Option<Slot> {
        self.slots.get(index).copied()
    }

    pub fn index_of(&self, slot: Slot) -> Option<usize> {
        self.index_of.get(&slot).copied()
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.index_of.contains_key(&slot)
    }

    /// Pairs a focused slot with its position in this snapshot, if any.
    pub fn focus(&self, slot: Slot) -> Focus {
        Focus { slot, index: self.index_of(slot) }
    }

    /// The view after the first slot has been renumbered to `target`, which
    /// must lie past the current end.
    pub fn rotate_front_to(&self, target: Slot) -> Result<SlotSnapshot> {
        let mut slots: Vec<Slot> = self.slots[1..].to_vec();
        slots.push(target);
        SlotSnapshot::new(slots)
    }

    /// Slots present here but absent from `earlier`.
    pub fn added_since(&self, earlier: &SlotSnapshot) -> Vec<Slot> {
        self.slots.iter().copied().filter(|slot| !earlier.contains(*slot)).collect()
    }
}

/// The focused slot and, when it is a member of the snapshot it was taken
/// with, its position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Focus {
    pub slot: Slot,
    pub index: Option<usize>,
}

impl Focus {
    pub fn index(&self) -> Result<usize> {
        self.index.ok_or_else(|| {
            Error::Invariant(format!("focused slot {} is not in the window list", self.slot))
        })
    }
}
