pub mod placement;
pub mod reorder;

pub use placement::place_new_window;
pub use reorder::{BackShift, ForwardShift, compact, shift_back, shift_forward};
