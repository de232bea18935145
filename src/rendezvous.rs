use std::path::{Path, PathBuf};

use tracing::{instrument, trace, warn};

use crate::common::error::Result;
use crate::common::util::shell_quote;
use crate::sys::wm::WindowManager;

pub mod channel;
pub mod token;

pub use channel::Channel;
pub use token::{TOKEN_LEN, Token};

pub const NEW_WINDOW_HOOK: &str = "newwindow";

/// The program the hook runs to announce a new window. Normally this binary.
#[derive(Clone, Debug)]
pub struct Helper {
    program: PathBuf,
    config: Option<PathBuf>,
}

impl Helper {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), config: None }
    }

    /// Config file handed to the helper as `--config`.
    pub fn with_config(mut self, config: Option<PathBuf>) -> Self {
        self.config = config;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn hook_command(&self, channel: &Channel, token: &Token) -> String {
        let config = match &self.config {
            Some(path) => format!(" --config {}", shell_quote(&path.to_string_lossy())),
            None => String::new(),
        };
        format!(
            "exec {}{config} signal --fifo {} {token}",
            shell_quote(&self.program.to_string_lossy()),
            shell_quote(&channel.path().to_string_lossy()),
        )
    }
}

/// A `newwindow` hook that is removed again when this guard goes away.
struct HookGuard<'a, W: WindowManager + ?Sized> {
    wm: &'a W,
    command: String,
}

impl<'a, W: WindowManager + ?Sized> HookGuard<'a, W> {
    fn install(wm: &'a W, command: String) -> Result<Self> {
        wm.add_hook(NEW_WINDOW_HOOK, &command)?;
        trace!("installed {NEW_WINDOW_HOOK} hook");
        Ok(Self { wm, command })
    }
}

impl<W: WindowManager + ?Sized> Drop for HookGuard<'_, W> {
    fn drop(&mut self) {
        match self.wm.remove_hook(NEW_WINDOW_HOOK, &self.command) {
            Ok(()) => trace!("removed {NEW_WINDOW_HOOK} hook"),
            Err(e) => warn!("could not remove {NEW_WINDOW_HOOK} hook `{}`: {e}", self.command),
        }
    }
}

/// Has the window manager run `command_line` and blocks until the window it
/// creates signals back over `channel` with this attempt's token.
///
/// The hook exists only for the duration of this call, whatever the outcome.
#[instrument(skip_all, fields(fifo = %channel.path().display()))]
pub fn spawn_and_wait<W: WindowManager + ?Sized>(
    wm: &W,
    channel: &Channel,
    helper: &Helper,
    command_line: &str,
) -> Result<()> {
    let token = Token::generate();
    let _hook = HookGuard::install(wm, helper.hook_command(channel, &token))?;
    wm.exec(command_line)?;
    channel.receive(&token)
}

/// The hook side: hands `token` to the waiting insertion.
///
/// Never takes the slot lock; the invocation holding it is the one waiting.
#[instrument(skip_all, fields(fifo = %channel.path().display()))]
pub fn signal(channel: &Channel, token: &str) -> Result<()> {
    let token = Token::parse(token)?;
    channel.send(&token)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nix::sys::stat::Mode;
    use nix::unistd::mkfifo;
    use test_log::test;

    use super::*;
    use crate::common::error::Error;
    use crate::testing::{FakeWm, Spawn};

    fn channel(dir: &tempfile::TempDir, timeout: Duration) -> Channel {
        let path = dir.path().join("rpwm.fifo");
        mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR).unwrap();
        Channel::new(path, timeout)
    }

    fn helper() -> Helper {
        Helper::new("/usr/local/bin/rparrange")
    }

    #[test]
    fn hook_command_invokes_signal_with_token() {
        let channel = Channel::new("/home/me/var/rpwm/rpwm.fifo", Duration::from_secs(5));
        let token = Token::parse(&"0f".repeat(16)).unwrap();
        assert_eq!(
            helper().hook_command(&channel, &token),
            format!(
                "exec /usr/local/bin/rparrange signal --fifo /home/me/var/rpwm/rpwm.fifo {}",
                "0f".repeat(16)
            )
        );
    }

    #[test]
    fn hook_command_quotes_awkward_paths() {
        let channel = Channel::new("/tmp/my fifo", Duration::from_secs(5));
        let token = Token::generate();
        let command = Helper::new("/opt/rp arrange").hook_command(&channel, &token);
        assert!(command.starts_with("exec '/opt/rp arrange' signal --fifo '/tmp/my fifo' "));
    }

    #[test]
    fn hook_command_passes_config_file_to_helper() {
        let channel = Channel::new("/tmp/rpwm.fifo", Duration::from_secs(5));
        let token = Token::parse(&"a1".repeat(16)).unwrap();
        let command = helper()
            .with_config(Some(PathBuf::from("/home/me/rp conf.toml")))
            .hook_command(&channel, &token);
        assert_eq!(
            command,
            format!(
                "exec /usr/local/bin/rparrange --config '/home/me/rp conf.toml' signal \
                 --fifo /tmp/rpwm.fifo {}",
                "a1".repeat(16)
            )
        );
    }

    #[test]
    fn confirms_spawned_window_and_removes_hook() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel(&dir, Duration::from_secs(5));
        let wm = FakeWm::new(&[0, 1], 0);

        spawn_and_wait(&wm, &channel, &helper(), "xterm").unwrap();

        assert!(wm.hooks().is_empty());
        let log = wm.log();
        assert!(log[0].starts_with("addhook newwindow exec /usr/local/bin/rparrange signal"));
        assert_eq!(log[1], "exec xterm");
        assert!(log[2].starts_with("remhook newwindow exec"));
        assert_eq!(&log[0]["addhook".len()..], &log[2]["remhook".len()..]);
        wm.join_helpers().into_iter().for_each(|r| r.unwrap());
    }

    #[test]
    fn timeout_still_removes_hook() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel(&dir, Duration::from_millis(200));
        let wm = FakeWm::new(&[0], 0).spawning(Spawn::Nothing);

        let err = spawn_and_wait(&wm, &channel, &helper(), "true").unwrap_err();
        assert!(matches!(err, Error::RendezvousTimeout { .. }), "{err:?}");
        assert!(wm.hooks().is_empty());
        assert!(wm.log().last().unwrap().starts_with("remhook newwindow"));
    }

    #[test]
    fn foreign_token_is_rejected_and_hook_removed() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel(&dir, Duration::from_secs(5));
        let wm = FakeWm::new(&[0], 0).spawning(Spawn::WindowSending("ab".repeat(16)));

        let err = spawn_and_wait(&wm, &channel, &helper(), "xterm").unwrap_err();
        assert!(matches!(err, Error::RendezvousIntegrity(_)), "{err:?}");
        assert!(wm.hooks().is_empty());
        wm.join_helpers().into_iter().for_each(|r| r.unwrap());
    }

    #[test]
    fn wrong_length_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel(&dir, Duration::from_secs(5));
        let wm = FakeWm::new(&[0], 0).spawning(Spawn::WindowSending("deadbeef".into()));

        let err = spawn_and_wait(&wm, &channel, &helper(), "xterm").unwrap_err();
        assert!(matches!(err, Error::RendezvousIntegrity(_)), "{err:?}");
        assert!(wm.hooks().is_empty());
        wm.join_helpers().into_iter().for_each(|r| r.unwrap());
    }

    #[test]
    fn failed_exec_removes_hook() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel(&dir, Duration::from_millis(200));
        let wm = FakeWm::new(&[0], 0).failing_on("exec");

        let err = spawn_and_wait(&wm, &channel, &helper(), "xterm").unwrap_err();
        assert!(matches!(err, Error::Collaborator { .. }), "{err:?}");
        assert!(wm.hooks().is_empty());
    }

    #[test]
    fn signal_rejects_malformed_token_before_touching_channel() {
        let channel = Channel::new("/nonexistent/fifo", Duration::from_millis(50));
        assert!(matches!(signal(&channel, "short"), Err(Error::RendezvousIntegrity(_))));
    }
}
