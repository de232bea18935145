use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::sys::wm::WmKind;

const DEFAULT_CONFIG: &str = include_str!("../../rparrange.default.toml");

pub fn home_dir() -> PathBuf { dirs::home_dir().unwrap_or_default() }
pub fn config_file() -> PathBuf { home_dir().join(".config").join("rparrange").join("config.toml") }

/// `~/var/rpwm` for ratpoison, `~/var/sdwm` for sdorfehs.
pub fn state_dir(wm: WmKind) -> PathBuf { home_dir().join("var").join(wm.state_dir_name()) }

pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    }
}

fn default_lock_timeout_ms() -> u64 { 10_000 }
fn default_fifo_timeout_ms() -> u64 { 5_000 }

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub wm: WmKind,
    #[serde(default)]
    pub wm_program: Option<PathBuf>,
    #[serde(default)]
    pub lock_file: Option<PathBuf>,
    #[serde(default)]
    pub fifo: Option<PathBuf>,
    #[serde(default)]
    pub helper: Option<PathBuf>,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    #[serde(default = "default_fifo_timeout_ms")]
    pub fifo_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wm: WmKind::default(),
            wm_program: None,
            lock_file: None,
            fifo: None,
            helper: None,
            lock_timeout_ms: default_lock_timeout_ms(),
            fifo_timeout_ms: default_fifo_timeout_ms(),
        }
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&buf).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Reads `path` if it exists, otherwise falls back to the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Ok(Config::default()) }
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> { Ok(toml::from_str(buf)?) }

    pub fn default_toml() -> &'static str { DEFAULT_CONFIG }

    pub fn wm_program(&self) -> PathBuf {
        self.wm_program
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(|| PathBuf::from(self.wm.program()))
    }

    pub fn lock_file(&self) -> PathBuf {
        self.lock_file.as_deref().map(expand_tilde).unwrap_or_else(|| {
            state_dir(self.wm).join(format!("{}.lock", self.wm.state_dir_name()))
        })
    }

    pub fn fifo(&self) -> PathBuf {
        self.fifo.as_deref().map(expand_tilde).unwrap_or_else(|| {
            state_dir(self.wm).join(format!("{}.fifo", self.wm.state_dir_name()))
        })
    }

    pub fn helper(&self) -> anyhow::Result<PathBuf> {
        match &self.helper {
            Some(helper) => Ok(expand_tilde(helper)),
            None => std::env::current_exe().context("locating the running executable"),
        }
    }

    pub fn lock_timeout(&self) -> Duration { Duration::from_millis(self.lock_timeout_ms) }

    pub fn fifo_timeout(&self) -> Duration { Duration::from_millis(self.fifo_timeout_ms) }

    /// Problems that would make every invocation fail, as readable messages.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.lock_timeout_ms == 0 {
            issues.push("lock_timeout_ms must be greater than 0".to_string());
        }
        if self.fifo_timeout_ms == 0 {
            issues.push("fifo_timeout_ms must be greater than 0".to_string());
        }

        let lock_file = self.lock_file();
        let fifo = self.fifo();
        if lock_file == fifo {
            issues.push(format!(
                "lock_file and fifo must differ (both are {})",
                fifo.display()
            ));
        }

        match std::fs::metadata(&fifo) {
            Ok(meta) if meta.file_type().is_fifo() => {}
            Ok(_) => issues.push(format!("{} exists but is not a fifo", fifo.display())),
            Err(_) => issues.push(format!(
                "fifo {} does not exist; create it with `mkfifo {}`",
                fifo.display(),
                fifo.display()
            )),
        }

        if let Some(helper) = &self.helper
            && !expand_tilde(helper).is_file()
        {
            issues.push(format!("helper {} is not a file", helper.display()));
        }

        issues
    }
}
