use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsFd;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::libc;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use tracing::{debug, trace};

use super::token::{TOKEN_LEN, Token};
use crate::common::error::{Error, Result};
use crate::sys::interrupt::Interrupt;

const POLL_SLICE: Duration = Duration::from_millis(50);

/// A pre-existing fifo carrying exactly one token per insertion.
///
/// Both ends open non-blocking and wait for their peer against the same
/// deadline, so neither side can hang past `timeout`.
#[derive(Clone, Debug)]
pub struct Channel {
    path: PathBuf,
    timeout: Duration,
    interrupt: Interrupt,
}

impl Channel {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { path: path.into(), timeout, interrupt: Interrupt::default() }
    }

    /// Lets `interrupt` cut either side's wait short.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Waits for one write and checks it is exactly `expected`.
    pub fn receive(&self, expected: &Token) -> Result<()> {
        self.check_fifo()?;
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)
            .map_err(Error::io(format!("opening {} for reading", self.path.display())))?;

        let deadline = Instant::now() + self.timeout;
        let mut received = Vec::with_capacity(TOKEN_LEN + 1);
        let mut chunk = [0u8; TOKEN_LEN + 1];
        while received.len() < TOKEN_LEN {
            self.wait_readable(&file, deadline)?;
            match (&file).read(&mut chunk) {
                // Writer closed.
                Ok(0) => break,
                Ok(n) => received.extend_from_slice(&chunk[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
                Err(e) => {
                    return Err(Error::Io {
                        context: format!("reading {}", self.path.display()),
                        source: e,
                    });
                }
            }
        }
        trace!("read {} bytes from {}", received.len(), self.path.display());

        if received.len() != TOKEN_LEN {
            return Err(Error::RendezvousIntegrity(format!(
                "expected {TOKEN_LEN} bytes, read {}",
                received.len()
            )));
        }
        if received != expected.as_bytes() {
            return Err(Error::RendezvousIntegrity("token does not match".into()));
        }
        debug!("rendezvous token confirmed");
        Ok(())
    }

    pub fn send(&self, token: &Token) -> Result<()> {
        self.send_bytes(token.as_bytes())
    }

    pub(crate) fn send_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.check_fifo()?;
        let deadline = Instant::now() + self.timeout;
        let mut file = loop {
            match OpenOptions::new()
                .write(true)
                .custom_flags(libc::O_NONBLOCK)
                .open(&self.path)
            {
                Ok(file) => break file,
                // No reader has the fifo open yet.
                Err(e) if e.raw_os_error() == Some(libc::ENXIO) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    return Err(Error::Io {
                        context: format!("opening {} for writing", self.path.display()),
                        source: e,
                    });
                }
            }
            self.sleep_until(deadline)?;
        };

        file.write_all(bytes)
            .map_err(Error::io(format!("writing {}", self.path.display())))?;
        debug!("sent {} bytes on {}", bytes.len(), self.path.display());
        Ok(())
    }

    fn check_fifo(&self) -> Result<()> {
        let meta = std::fs::metadata(&self.path).map_err(Error::io(format!(
            "rendezvous channel {} (create it with mkfifo)",
            self.path.display()
        )))?;
        if meta.file_type().is_fifo() {
            Ok(())
        } else {
            Err(Error::Io {
                context: format!("rendezvous channel {}", self.path.display()),
                source: std::io::Error::new(ErrorKind::InvalidInput, "not a fifo"),
            })
        }
    }

    fn timed_out(&self) -> Error {
        Error::RendezvousTimeout { path: self.path.clone(), timeout: self.timeout }
    }

    fn sleep_until(&self, deadline: Instant) -> Result<()> {
        self.interrupt.check()?;
        let now = Instant::now();
        if now >= deadline {
            return Err(self.timed_out());
        }
        thread::sleep(POLL_SLICE.min(deadline - now));
        Ok(())
    }

    fn wait_readable(&self, file: &File, deadline: Instant) -> Result<()> {
        loop {
            self.interrupt.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out());
            }
            let slice = POLL_SLICE.min(deadline - now);
            let timeout = PollTimeout::from(u16::try_from(slice.as_millis()).unwrap_or(u16::MAX));

            let mut fds = [PollFd::new(file.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, timeout) {
                Ok(0) => continue,
                Ok(_) => {
                    let ready = fds[0].revents().unwrap_or(PollFlags::empty());
                    if ready.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR)
                    {
                        return Ok(());
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(errno) => {
                    return Err(Error::Io {
                        context: format!("polling {}", self.path.display()),
                        source: errno.into(),
                    });
                }
            }
        }
    }
}
