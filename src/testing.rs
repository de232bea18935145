//! A scripted stand-in for ratpoison that keeps just enough state to check
//! the effect of the commands sent to it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::common::error::{Error, Result};
use crate::model::Slot;
use crate::rendezvous::{Channel, NEW_WINDOW_HOOK, Token};
use crate::sys::wm::WindowManager;

pub type WindowId = u32;

/// What happens when the fake is asked to `exec` something.
#[derive(Clone, Debug)]
pub enum Spawn {
    /// Map a window at the lowest free number, focus it, run the hooks.
    Window,
    /// Like `Window`, but the hook writes these bytes instead of its token.
    WindowSending(String),
    /// The command never produces a window.
    Nothing,
}

#[derive(Debug)]
struct State {
    windows: BTreeMap<u32, WindowId>,
    focused: Option<WindowId>,
    next_id: WindowId,
    hooks: Vec<(String, String)>,
    log: Vec<String>,
    spawn: Spawn,
    fail_on: Option<String>,
    helpers: Vec<JoinHandle<Result<()>>>,
}

pub struct FakeWm {
    state: RefCell<State>,
}

impl FakeWm {
    /// Windows get ids equal to their starting slot.
    pub fn new(slots: &[u32], focused: u32) -> Self {
        let windows: BTreeMap<u32, WindowId> = slots.iter().map(|&s| (s, s)).collect();
        let focused = windows.get(&focused).copied();
        let next_id = slots.iter().max().map_or(0, |m| m + 1000);
        Self {
            state: RefCell::new(State {
                windows,
                focused,
                next_id,
                hooks: Vec::new(),
                log: Vec::new(),
                spawn: Spawn::Window,
                fail_on: None,
                helpers: Vec::new(),
            }),
        }
    }

    pub fn spawning(self, spawn: Spawn) -> Self {
        self.state.borrow_mut().spawn = spawn;
        self
    }

    /// Commands starting with `prefix` fail like a crashed window manager.
    pub fn failing_on(self, prefix: &str) -> Self {
        self.state.borrow_mut().fail_on = Some(prefix.to_string());
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.state.borrow().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.borrow_mut().log.clear();
    }

    /// Renumbering commands only, in the order they were sent.
    pub fn number_log(&self) -> Vec<String> {
        self.log().into_iter().filter(|c| c.starts_with("number")).collect()
    }

    pub fn hooks(&self) -> Vec<(String, String)> {
        self.state.borrow().hooks.clone()
    }

    pub fn slots(&self) -> Vec<u32> {
        self.state.borrow().windows.keys().copied().collect()
    }

    /// Window ids in slot order.
    pub fn order(&self) -> Vec<WindowId> {
        self.state.borrow().windows.values().copied().collect()
    }

    pub fn slot_of(&self, id: WindowId) -> Option<u32> {
        let state = self.state.borrow();
        state.windows.iter().find(|(_, w)| **w == id).map(|(s, _)| *s)
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.state.borrow().focused
    }

    pub fn join_helpers(&self) -> Vec<Result<()>> {
        let helpers = std::mem::take(&mut self.state.borrow_mut().helpers);
        helpers.into_iter().map(|h| h.join().expect("helper thread panicked")).collect()
    }
}

impl State {
    fn slot_of(&self, id: WindowId) -> Option<u32> {
        self.windows.iter().find(|(_, w)| **w == id).map(|(s, _)| *s)
    }

    /// ratpoison swaps numbers when the destination is taken.
    fn renumber(&mut self, from: u32, to: u32) -> std::result::Result<(), String> {
        let window = self.windows.remove(&from).ok_or(format!("no window {from}"))?;
        if let Some(other) = self.windows.remove(&to) {
            self.windows.insert(from, other);
        }
        self.windows.insert(to, window);
        Ok(())
    }

    fn spawn_window(&mut self) {
        let slot = (0..).find(|s| !self.windows.contains_key(s)).unwrap_or_default();
        let id = self.next_id;
        self.next_id += 1;
        self.windows.insert(slot, id);
        self.focused = Some(id);

        let payload = match &self.spawn {
            Spawn::WindowSending(bytes) => Some(bytes.clone()),
            _ => None,
        };
        let hooks: Vec<String> = self
            .hooks
            .iter()
            .filter(|(event, _)| event == NEW_WINDOW_HOOK)
            .map(|(_, command)| command.clone())
            .collect();
        for hook in hooks {
            let words: Vec<&str> = hook.split_whitespace().collect();
            let fifo = words
                .iter()
                .position(|w| *w == "--fifo")
                .and_then(|i| words.get(i + 1))
                .map(PathBuf::from);
            let token = words.last().map(|t| t.to_string());
            let (Some(fifo), Some(token)) = (fifo, token) else { continue };
            let payload = payload.clone();
            self.helpers.push(thread::spawn(move || {
                let channel = Channel::new(fifo, Duration::from_secs(5));
                match payload {
                    Some(bytes) => channel.send_bytes(bytes.as_bytes()),
                    None => channel.send(&Token::parse(&token)?),
                }
            }));
        }
    }

    fn run(&mut self, cmd: &str) -> std::result::Result<String, String> {
        let (verb, rest) = cmd.split_once(' ').unwrap_or((cmd, ""));
        match verb {
            "windows" => Ok(self.windows.keys().map(|s| format!("{s}\n")).collect()),
            "info" => match self.focused.and_then(|id| self.slot_of(id)) {
                Some(slot) => Ok(format!("(1920, 1080) {slot}(xterm) xterm\n")),
                None => Ok("(1920, 1080) No window.\n".into()),
            },
            "number" => {
                let args: Vec<u32> = rest
                    .split_whitespace()
                    .map(|a| a.parse().map_err(|_| format!("bad number {a:?}")))
                    .collect::<std::result::Result<_, _>>()?;
                let renumbered = match args[..] {
                    [to] => {
                        let from = self
                            .focused
                            .and_then(|id| self.slot_of(id))
                            .ok_or("no focused window")?;
                        self.renumber(from, to)
                    }
                    [to, from] => self.renumber(from, to),
                    _ => Err("number takes one or two arguments".into()),
                };
                renumbered.map(|()| String::new())
            }
            "addhook" => {
                let (event, command) = rest.split_once(' ').ok_or("addhook needs a command")?;
                self.hooks.push((event.to_string(), command.to_string()));
                Ok(String::new())
            }
            "remhook" => {
                let (event, command) = rest.split_once(' ').ok_or("remhook needs a command")?;
                self.hooks.retain(|(e, c)| !(e == event && c == command));
                Ok(String::new())
            }
            "exec" => {
                if !matches!(self.spawn, Spawn::Nothing) {
                    self.spawn_window();
                }
                Ok(String::new())
            }
            _ => Err(format!("unknown command {verb}")),
        }
    }
}

impl WindowManager for FakeWm {
    fn command(&self, cmd: &str) -> Result<String> {
        let mut state = self.state.borrow_mut();
        state.log.push(cmd.to_string());
        if let Some(prefix) = &state.fail_on
            && cmd.starts_with(prefix.as_str())
        {
            return Err(Error::Collaborator {
                command: cmd.to_string(),
                reason: "exit status: 1".into(),
            });
        }
        state
            .run(cmd)
            .map_err(|reason| Error::Collaborator { command: cmd.to_string(), reason })
    }
}

pub fn slots(values: &[u32]) -> Vec<Slot> {
    values.iter().copied().map(Slot).collect()
}
