use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rparrange::common::config::{Config, config_file};
use rparrange::common::log;
use rparrange::common::util::multicall_args;
use rparrange::controller::{Arranger, Operation, Settings};
use rparrange::sys::interrupt::{self, Interrupt};
use rparrange::sys::wm::{Ratpoison, WmKind};
use tracing::warn;

/// sysexits.h EX_SOFTWARE
const EXIT_FAILURE: i32 = 70;

#[derive(Parser)]
#[command(name = "rparrange")]
#[command(about = "Rearrange ratpoison window numbers")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Window manager to drive (overrides the config file).
    #[arg(long, value_enum)]
    wm: Option<WmKind>,

    /// Check the configuration and the fifo without touching any windows.
    #[arg(long)]
    validate: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Move the current window one number down, wrapping to the end when first
    Left {
        /// Repeat the move this many times
        #[arg(long, short, default_value_t = 1)]
        count: usize,
    },
    /// Move the current window one number up, wrapping to the front when last
    Right,
    /// Renumber all windows sequentially from 0, keeping their order
    Renumber,
    /// Run a command and number its window right after the current one
    Insert {
        /// Command line to run; a single argument is passed to the shell as is
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Internal: run by the newwindow hook to confirm an insertion
    #[command(hide = true)]
    Signal {
        /// Fifo the inserting invocation is waiting on
        #[arg(long, value_name = "PATH")]
        fifo: Option<PathBuf>,
        token: String,
    },
}

impl Commands {
    fn into_operation(self) -> (Operation, Option<PathBuf>) {
        match self {
            Commands::Left { count } => (Operation::ShiftBack { count }, None),
            Commands::Right => (Operation::ShiftForward, None),
            Commands::Renumber => (Operation::Compact, None),
            Commands::Insert { command } => (Operation::InsertAfter { command }, None),
            Commands::Signal { fifo, token } => (Operation::Signal { token }, fifo),
        }
    }
}

fn main() {
    sigpipe::reset();
    let opt = Cli::parse_from(multicall_args(std::env::args_os()));
    log::init_logging();

    if let Err(e) = run(opt) {
        eprintln!("rparrange: {e:#}");
        process::exit(EXIT_FAILURE);
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let config_path = opt.config.clone().unwrap_or_else(config_file);
    let mut config = Config::load(&config_path)?;
    if let Some(wm) = opt.wm {
        config.wm = wm;
    }

    if opt.validate {
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config validation passed");
            return Ok(());
        }
        for issue in &issues {
            eprintln!("{issue}");
        }
        anyhow::bail!("{} configuration issue(s)", issues.len());
    }

    let Some(command) = opt.command else {
        anyhow::bail!("no operation given; see --help");
    };
    let (op, fifo) = command.into_operation();
    if let Some(fifo) = fifo {
        config.fifo = Some(fifo);
    }

    let interrupt = interrupt::install().unwrap_or_else(|e| {
        warn!("could not install interrupt handler: {e}");
        Interrupt::default()
    });
    // The hook runs from the window manager's working directory.
    let forwarded_config = opt
        .config
        .as_deref()
        .map(std::path::absolute)
        .transpose()
        .context("resolving --config path")?;

    let settings = Settings {
        config_file: forwarded_config,
        interrupt,
        ..Settings::from_config(&config)?
    };
    let arranger = Arranger::new(Ratpoison::new(config.wm_program()), settings);
    arranger.run(&op).with_context(|| format!("{} failed", op.name()))
}

