use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not acquire lock {} within {timeout:?}", path.display())]
    LockTimeout { path: PathBuf, timeout: Duration },
    #[error("unexpected window manager output: {0}")]
    Protocol(String),
    #[error("inconsistent slot state: {0}")]
    Invariant(String),
    #[error("no rendezvous peer on {} within {timeout:?}", path.display())]
    RendezvousTimeout { path: PathBuf, timeout: Duration },
    #[error("rendezvous token rejected: {0}")]
    RendezvousIntegrity(String),
    #[error("window manager command `{command}` failed: {reason}")]
    Collaborator { command: String, reason: String },
    #[error("interrupted")]
    Interrupted,
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Wraps an I/O failure with a short description of what was being done.
    pub fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> Error {
        let context = context.into();
        move |source| Error::Io { context, source }
    }
}
