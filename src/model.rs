pub mod command;
pub mod slot;

pub use command::WmCommand;
pub use slot::{Focus, Slot, SlotSnapshot};
