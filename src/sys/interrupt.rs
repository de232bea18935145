use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::common::error::{Error, Result};

/// Shared flag polled by the bounded waits, so an interrupt unwinds through
/// their guards instead of killing the process mid-wait.
#[derive(Clone, Debug, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_raised() { Err(Error::Interrupted) } else { Ok(()) }
    }
}

/// Routes SIGINT into a fresh [`Interrupt`]. Only one handler per process.
pub fn install() -> std::result::Result<Interrupt, ctrlc::Error> {
    let interrupt = Interrupt::default();
    let handler = interrupt.clone();
    ctrlc::set_handler(move || handler.raise())?;
    Ok(interrupt)
}
