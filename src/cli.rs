// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::parse_duration;
use crate::types::Encoding;

/// Command-line arguments for `procstream`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procstream",
    version,
    about = "Resolve and run a command, streaming or collecting its output.",
    long_about = None
)]
pub struct CliArgs {
    /// Profile with default options (TOML).
    ///
    /// Default: `Procstream.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Kill the process after this long (e.g. `500ms`, `30s`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Extra launches allowed after a nonzero exit.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Delay between retries (default 1s).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub retry_delay: Option<Duration>,

    /// Print stdout and stderr separately instead of merged.
    #[arg(long)]
    pub split: bool,

    /// Tee the child's output to this terminal while it runs.
    #[arg(long)]
    pub echo: bool,

    /// Launch in its own process group and terminate the whole tree.
    #[arg(long)]
    pub detached: bool,

    /// Output decoding (utf8, utf8-lossy, latin1).
    #[arg(long, value_name = "ENCODING")]
    pub encoding: Option<Encoding>,

    /// Forward this process's stdin to the child.
    #[arg(long)]
    pub stdin: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCSTREAM_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the resolved command, but don't run it.
    #[arg(long)]
    pub dry_run: bool,

    /// Executable to run.
    #[arg(value_name = "EXE")]
    pub exe: String,

    /// Arguments passed to the executable.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
