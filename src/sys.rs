pub mod interrupt;
pub mod lock;
pub mod wm;
