use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::arrange_engine::{self, ForwardShift};
use crate::common::config::Config;
use crate::common::error::{Error, Result};
use crate::common::util::command_line;
use crate::model::{Focus, Slot, SlotSnapshot, WmCommand};
use crate::rendezvous::{self, Channel, Helper};
use crate::sys::interrupt::Interrupt;
use crate::sys::lock::SlotLock;
use crate::sys::wm::WindowManager;

/// Everything one invocation can be asked to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Move the focused window one slot back, rotating to the end when first.
    ShiftBack { count: usize },
    /// Move the focused window one slot forward, rotating to the front when last.
    ShiftForward,
    /// Renumber all windows to 0, 1, 2, ... keeping their order.
    Compact,
    /// Run a command and put the window it creates right after the focused one.
    InsertAfter { command: Vec<String> },
    /// Hook side of an insertion: pass the token to the waiting invocation.
    Signal { token: String },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ShiftBack { .. } => "left",
            Operation::ShiftForward => "right",
            Operation::Compact => "renumber",
            Operation::InsertAfter { .. } => "insert",
            Operation::Signal { .. } => "signal",
        }
    }
}

/// Resolved paths and bounds for one invocation.
#[derive(Clone, Debug)]
pub struct Settings {
    pub lock_file: PathBuf,
    pub lock_timeout: Duration,
    pub fifo: PathBuf,
    pub fifo_timeout: Duration,
    pub helper: PathBuf,
    /// Explicit config file, forwarded to the helper the hook runs.
    pub config_file: Option<PathBuf>,
    pub interrupt: Interrupt,
}

impl Settings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            lock_file: config.lock_file(),
            lock_timeout: config.lock_timeout(),
            fifo: config.fifo(),
            fifo_timeout: config.fifo_timeout(),
            helper: config.helper()?,
            config_file: None,
            interrupt: Interrupt::default(),
        })
    }

    fn channel(&self) -> Channel {
        Channel::new(&self.fifo, self.fifo_timeout).with_interrupt(self.interrupt.clone())
    }

    fn helper(&self) -> Helper {
        Helper::new(&self.helper).with_config(self.config_file.clone())
    }
}

pub struct Arranger<W> {
    wm: W,
    settings: Settings,
}

impl<W: WindowManager> Arranger<W> {
    pub fn new(wm: W, settings: Settings) -> Self {
        Self { wm, settings }
    }

    pub fn wm(&self) -> &W {
        &self.wm
    }

    #[instrument(skip(self), fields(op = op.name()))]
    pub fn run(&self, op: &Operation) -> Result<()> {
        // The signal comes from a hook while the inserting invocation holds
        // the lock and waits for it.
        if let Operation::Signal { token } = op {
            return rendezvous::signal(&self.settings.channel(), token);
        }

        let _lock = SlotLock::acquire(
            &self.settings.lock_file,
            self.settings.lock_timeout,
            &self.settings.interrupt,
        )?;
        let (snapshot, focus) = self.wm.snapshot()?;
        debug!(slots = ?snapshot.slots(), current = %focus.slot, "took snapshot");

        match op {
            Operation::ShiftBack { count } => self.shift_back(snapshot, focus, *count),
            Operation::ShiftForward => self.shift_forward(snapshot, focus),
            Operation::Compact => self.wm.send_all(&arrange_engine::compact(&snapshot)?),
            Operation::InsertAfter { command } => self.insert_after(&snapshot, focus, command),
            Operation::Signal { .. } => {
                Err(Error::Invariant(format!("`{}` dispatched under the lock", op.name())))
            }
        }
    }

    fn shift_back(&self, mut snapshot: SlotSnapshot, mut focus: Focus, count: usize) -> Result<()> {
        for step in 0..count {
            let shift = arrange_engine::shift_back(&snapshot, focus.index()?)?;
            self.wm.send(&shift.command())?;
            if step + 1 < count {
                snapshot = shift.next_view(&snapshot)?;
                // Renumbering may have moved focus along with the window.
                focus = snapshot.focus(self.wm.focused_slot()?);
            }
        }
        Ok(())
    }

    fn shift_forward(&self, snapshot: SlotSnapshot, focus: Focus) -> Result<()> {
        match arrange_engine::shift_forward(&snapshot, focus.index()?)? {
            ForwardShift::Next(target) => self.wm.send(&WmCommand::Number(target)),
            ForwardShift::RotateBack { times } => self.shift_back(snapshot, focus, times),
        }
    }

    fn insert_after(
        &self,
        original: &SlotSnapshot,
        focus: Focus,
        command: &[String],
    ) -> Result<()> {
        if command.is_empty() {
            return Err(Error::Invariant("insert needs a command to run".into()));
        }
        let current_index = focus.index()?;
        let target = focus.slot.next()?;

        rendezvous::spawn_and_wait(
            &self.wm,
            &self.settings.channel(),
            &self.settings.helper(),
            &command_line(command),
        )?;

        let new_slot = self.new_window_slot(original)?;
        info!(%new_slot, %target, "new window mapped");
        let commands = arrange_engine::place_new_window(original, current_index, new_slot)?;
        self.wm.send_all(&commands)
    }

    /// Finds the window that appeared since `original` was taken. A focused
    /// slot outside the original list is expected here and not an error.
    fn new_window_slot(&self, original: &SlotSnapshot) -> Result<Slot> {
        let (fresh, focus) = self.wm.snapshot()?;
        match fresh.added_since(original)[..] {
            [slot] => Ok(slot),
            _ if !original.contains(focus.slot) => Ok(focus.slot),
            _ => Err(Error::Invariant(format!(
                "cannot tell which window is new (focused slot {} already existed)",
                focus.slot
            ))),
        }
    }
}
