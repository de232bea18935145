use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::common::error::{Error, Result};
use crate::model::{Focus, Slot, SlotSnapshot, WmCommand};

static INFO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\(\d+,\s*\d+\)\s+(\d+)").unwrap());

/// Window manager variants that speak the ratpoison command language.
#[derive(
    Serialize, Deserialize, clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum WmKind {
    #[default]
    Ratpoison,
    Sdorfehs,
}

impl WmKind {
    pub fn program(self) -> &'static str {
        match self {
            WmKind::Ratpoison => "ratpoison",
            WmKind::Sdorfehs => "sdorfehs",
        }
    }

    /// Directory under `~/var` holding this variant's lock and fifo.
    pub fn state_dir_name(self) -> &'static str {
        match self {
            WmKind::Ratpoison => "rpwm",
            WmKind::Sdorfehs => "sdwm",
        }
    }
}

/// Control channel to the window manager: one command string in, its text
/// output back.
pub trait WindowManager {
    fn command(&self, cmd: &str) -> Result<String>;

    fn list_slots(&self) -> Result<Vec<Slot>> {
        parse_slots(&self.command("windows %n")?)
    }

    fn focused_slot(&self) -> Result<Slot> {
        parse_focused(&self.command("info")?)
    }

    /// Occupied slots plus the focused one. The focus carries no index if the
    /// window manager reports a focused slot missing from the list.
    fn snapshot(&self) -> Result<(SlotSnapshot, Focus)> {
        let snapshot = SlotSnapshot::new(self.list_slots()?)?;
        let focus = snapshot.focus(self.focused_slot()?);
        trace!(slots = ?snapshot.slots(), ?focus, "snapshot");
        Ok((snapshot, focus))
    }

    fn send(&self, command: &WmCommand) -> Result<()> {
        debug!("sending `{command}`");
        self.command(&command.to_string()).map(drop)
    }

    fn send_all(&self, commands: &[WmCommand]) -> Result<()> {
        commands.iter().try_for_each(|command| self.send(command))
    }

    fn add_hook(&self, event: &str, command: &str) -> Result<()> {
        self.command(&format!("addhook {event} {command}")).map(drop)
    }

    fn remove_hook(&self, event: &str, command: &str) -> Result<()> {
        self.command(&format!("remhook {event} {command}")).map(drop)
    }

    fn exec(&self, command_line: &str) -> Result<()> {
        self.command(&format!("exec {command_line}")).map(drop)
    }
}

impl<W: WindowManager + ?Sized> WindowManager for &W {
    fn command(&self, cmd: &str) -> Result<String> {
        (**self).command(cmd)
    }
}

/// Talks to a running ratpoison (or sdorfehs) through `<program> -c`.
#[derive(Clone, Debug)]
pub struct Ratpoison {
    program: PathBuf,
}

impl Ratpoison {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl WindowManager for Ratpoison {
    fn command(&self, cmd: &str) -> Result<String> {
        trace!("{} -c {cmd:?}", self.program.display());
        let output = Command::new(&self.program).arg("-c").arg(cmd).output().map_err(|e| {
            Error::Collaborator {
                command: cmd.to_string(),
                reason: format!("could not run {}: {e}", self.program.display()),
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Collaborator {
                command: cmd.to_string(),
                reason: format!("{} ({})", output.status, stderr.trim()),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

pub fn parse_slots(text: &str) -> Result<Vec<Slot>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<u32>()
                .map(Slot)
                .map_err(|_| Error::Protocol(format!("window number expected, got {line:?}")))
        })
        .collect()
}

pub fn parse_focused(text: &str) -> Result<Slot> {
    let caps = INFO_RE
        .captures(text)
        .ok_or_else(|| Error::Protocol(format!("unrecognised window info {:?}", text.trim())))?;
    caps[1]
        .parse::<u32>()
        .map(Slot)
        .map_err(|_| Error::Protocol(format!("window number out of range in {:?}", text.trim())))
}
