use crate::common::error::{Error, Result};
use crate::model::{Slot, SlotSnapshot, WmCommand};

/// Commands that move a freshly created window at `new_slot` to the slot
/// right after the window that was focused at `current_index` in `original`.
///
/// When that slot is taken, the contiguous run starting there is shifted up by
/// one, highest first, after parking the new window two past the old maximum.
/// Gaps further along are left alone.
pub fn place_new_window(
    original: &SlotSnapshot,
    current_index: usize,
    new_slot: Slot,
) -> Result<Vec<WmCommand>> {
    let current = original.get(current_index).ok_or_else(|| {
        Error::Invariant(format!(
            "current index {current_index} outside window list of {}",
            original.len()
        ))
    })?;
    let target = current.next()?;

    if new_slot == target {
        return Ok(Vec::new());
    }
    if !original.contains(target) {
        return Ok(vec![WmCommand::renumber(new_slot, target)]);
    }

    let parked = original.last().offset(2)?;
    let mut commands = Vec::new();
    if new_slot != parked {
        commands.push(WmCommand::renumber(new_slot, parked));
    }

    let slots = original.slots();
    let run_end = (current_index..slots.len())
        .find(|&i| slots[i].next().map_or(true, |above| !original.contains(above)))
        .unwrap_or(slots.len() - 1);

    for &slot in slots[current_index + 1..=run_end].iter().rev() {
        commands.push(WmCommand::renumber(slot, slot.next()?));
    }

    commands.push(WmCommand::renumber(parked, target));
    Ok(commands)
}
