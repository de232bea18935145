use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use tracing::{debug, trace};

use crate::common::error::{Error, Result};
use crate::sys::interrupt::Interrupt;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Exclusive hold on the lock file shared by every invocation that talks to
/// the same window manager. Released on drop.
pub struct SlotLock {
    _flock: Flock<File>,
    path: PathBuf,
}

impl SlotLock {
    /// Polls a non-blocking flock until it succeeds, `timeout` passes or
    /// `interrupt` is raised.
    pub fn acquire(path: &Path, timeout: Duration, interrupt: &Interrupt) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(Error::io(format!("creating {}", parent.display())))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(Error::io(format!("opening lock file {}", path.display())))?;

        let deadline = Instant::now() + timeout;
        loop {
            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(flock) => {
                    debug!("acquired lock {}", path.display());
                    return Ok(Self { _flock: flock, path: path.to_path_buf() });
                }
                Err((f, errno)) if errno == Errno::EWOULDBLOCK || errno == Errno::EINTR => {
                    file = f;
                }
                Err((_, errno)) => {
                    return Err(Error::Io {
                        context: format!("locking {}", path.display()),
                        source: errno.into(),
                    });
                }
            }

            interrupt.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::LockTimeout { path: path.to_path_buf(), timeout });
            }
            trace!("lock {} busy, waiting", path.display());
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for SlotLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotLock").field("path", &self.path).finish_non_exhaustive()
    }
}

impl Drop for SlotLock {
    fn drop(&mut self) {
        debug!("releasing lock {}", self.path.display());
    }
}
