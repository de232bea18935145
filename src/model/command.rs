use std::fmt;

use super::Slot;

/// One renumbering instruction for the window manager.
///
/// Rendered in ratpoison's `number` syntax. If the destination is already
/// taken, the window manager swaps the two windows' numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WmCommand {
    /// Renumber the focused window.
    Number(Slot),
    /// Renumber the window at `from`.
    Renumber { from: Slot, to: Slot },
}

impl WmCommand {
    pub fn renumber(from: Slot, to: Slot) -> Self {
        WmCommand::Renumber { from, to }
    }

    pub fn target(&self) -> Slot {
        match self {
            WmCommand::Number(to) | WmCommand::Renumber { to, .. } => *to,
        }
    }
}

impl fmt::Display for WmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WmCommand::Number(to) => write!(f, "number {to}"),
            WmCommand::Renumber { from, to } => write!(f, "number {to} {from}"),
        }
    }
}
