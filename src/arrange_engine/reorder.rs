use crate::common::error::{Error, Result};
use crate::model::{Slot, SlotSnapshot, WmCommand};

/// One step of moving the focused window towards the front of the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackShift {
    pub target: Slot,
    /// The focused window was first and goes past the current end.
    pub wraps: bool,
}

impl BackShift {
    pub fn command(&self) -> WmCommand {
        WmCommand::Number(self.target)
    }

    /// The set of occupied slots once this step has been applied.
    ///
    /// A plain step swaps two occupied slots and leaves the set unchanged.
    pub fn next_view(&self, snapshot: &SlotSnapshot) -> Result<SlotSnapshot> {
        if self.wraps {
            snapshot.rotate_front_to(self.target)
        } else {
            Ok(snapshot.clone())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardShift {
    Next(Slot),
    /// The focused window is last. Rotating every other window back once
    /// brings it to the front.
    RotateBack { times: usize },
}

fn check_index(snapshot: &SlotSnapshot, current_index: usize) -> Result<()> {
    if current_index < snapshot.len() {
        Ok(())
    } else {
        Err(Error::Invariant(format!(
            "current index {current_index} outside window list of {}",
            snapshot.len()
        )))
    }
}

pub fn shift_back(snapshot: &SlotSnapshot, current_index: usize) -> Result<BackShift> {
    check_index(snapshot, current_index)?;
    if current_index == 0 {
        Ok(BackShift { target: snapshot.last().next()?, wraps: true })
    } else {
        Ok(BackShift {
            target: snapshot.slots()[current_index - 1],
            wraps: false,
        })
    }
}

pub fn shift_forward(snapshot: &SlotSnapshot, current_index: usize) -> Result<ForwardShift> {
    check_index(snapshot, current_index)?;
    if current_index + 1 == snapshot.len() {
        Ok(ForwardShift::RotateBack { times: snapshot.len() - 1 })
    } else {
        Ok(ForwardShift::Next(snapshot.slots()[current_index + 1]))
    }
}

/// Renumbers every window to its position in the list, lowest first.
///
/// Slot `i` is always free by the time position `i` is processed, so no
/// command ever swaps two windows.
pub fn compact(snapshot: &SlotSnapshot) -> Result<Vec<WmCommand>> {
    let mut commands = Vec::new();
    for (position, &slot) in snapshot.slots().iter().enumerate() {
        let to = Slot::at_position(position)?;
        if slot != to {
            commands.push(WmCommand::renumber(slot, to));
        }
    }
    Ok(commands)
}
