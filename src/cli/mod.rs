use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::logging::{LogConfig, LogTarget};

#[derive(Parser, Debug)]
#[command(
    name = "git-rewind",
    version,
    about = "Step through a file's history with a line-by-line blame view"
)]
pub struct Cli {
    /// File to browse. When omitted the viewer starts empty; press `o` to open one.
    pub file: Option<PathBuf>,

    /// Branch or ref whose history is walked.
    #[arg(short, long, default_value = "HEAD")]
    pub rev: String,

    /// Print the blame of one revision to stdout instead of launching the TUI.
    #[arg(short, long, requires = "file")]
    pub print: bool,

    /// With --print: revision (id prefix) to print instead of the newest.
    #[arg(long, value_name = "PREFIX", requires = "print")]
    pub at: Option<String>,

    /// Append logs to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Logging setup for this invocation. The TUI owns the terminal, so
    /// without --log-file interactive runs collect no logs.
    pub fn log_config(&self) -> LogConfig {
        let target = match (&self.log_file, self.print) {
            (Some(path), _) => LogTarget::File(path.clone()),
            (None, true) => LogTarget::Stderr,
            (None, false) => LogTarget::Off,
        };
        LogConfig::from_verbosity(self.verbose, target)
    }
}

/// Parse CLI arguments.
pub fn parse_args() -> Cli {
    Cli::parse()
}
