// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod resolve;
pub mod types;

use std::io::{Read, Write};

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{Profile, default_config_path, load_and_validate};
use crate::errors::ProcessError;
use crate::exec::{Executor, InputSource, Output, SpawnOptions, SpawnRequest};

pub use crate::errors::{ErrorKind, ProcstreamError};
pub use crate::exec::{EventStream, OutputEvent, SplitOutput};
pub use crate::resolve::{ResolvedCommand, resolve};
pub use crate::types::{Encoding, OutputSource, StdioConfig, StdioMode};

/// Event stream for `exe args` with `options`' timeout and retry policy.
pub fn spawn<I, S>(exe: &str, args: I, options: SpawnOptions) -> EventStream
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Executor::default().spawn(SpawnRequest::new(exe, args).with_options(options))
}

/// Run to completion and return all output merged.
pub async fn run<I, S>(exe: &str, args: I, options: SpawnOptions) -> Result<String, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Executor::default()
        .run(SpawnRequest::new(exe, args).with_options(options))
        .await
}

/// Run to completion and return stdout and stderr separately.
pub async fn run_split<I, S>(
    exe: &str,
    args: I,
    options: SpawnOptions,
) -> Result<SplitOutput, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Executor::default()
        .run_split(SpawnRequest::new(exe, args).with_options(options))
        .await
}

/// Like [`run`], in a process group that is terminated as a unit.
pub async fn run_detached<I, S>(
    exe: &str,
    args: I,
    options: SpawnOptions,
) -> Result<String, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Executor::default()
        .run_detached(SpawnRequest::new(exe, args).with_options(options))
        .await
}

/// Like [`run_split`], in a process group that is terminated as a unit.
pub async fn run_detached_split<I, S>(
    exe: &str,
    args: I,
    options: SpawnOptions,
) -> Result<SplitOutput, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Executor::default()
        .run_detached_split(SpawnRequest::new(exe, args).with_options(options))
        .await
}

/// High-level entry point used by `main.rs`. Returns the exit code the
/// binary should exit with.
///
/// This wires together:
/// - profile loading
/// - CLI overrides
/// - resolution (and `--dry-run`)
/// - execution and output printing
pub async fn run_cli(args: CliArgs) -> Result<i32> {
    let profile = load_profile(&args)?;
    let options = build_options(&args, &profile)?;
    let request = SpawnRequest::new(&args.exe, args.args.clone()).with_options(options);
    let executor = Executor::default();

    if args.dry_run {
        let resolved = executor.resolve_request(&request);
        println!("{resolved}");
        debug!("dry-run complete (no execution)");
        return Ok(0);
    }

    let echoed = request.options.echo_output;
    info!(exe = %request.executable, "running");

    match executor.run_output(request).await {
        Ok(output) => {
            if !echoed {
                print_output(&output)?;
            }
            Ok(0)
        }
        Err(err) => {
            if !echoed {
                if let (Some(out), Some(errout)) = (&err.stdout, &err.stderr) {
                    print_output(&Output::Split(SplitOutput {
                        stdout: out.clone(),
                        stderr: errout.clone(),
                    }))?;
                } else if let Some(out) = &err.stdout {
                    print!("{out}");
                }
            }
            let last_line = err.message.lines().last().unwrap_or_default();
            eprintln!("procstream: {last_line}");
            Ok(exit_status_for(&err))
        }
    }
}

fn load_profile(args: &CliArgs) -> Result<Profile> {
    match &args.config {
        Some(path) => Ok(load_and_validate(path)?),
        None => {
            let path = default_config_path();
            if path.is_file() {
                debug!(path = %path.display(), "using profile from working directory");
                Ok(load_and_validate(&path)?)
            } else {
                Ok(Profile::default())
            }
        }
    }
}

fn build_options(args: &CliArgs, profile: &Profile) -> Result<SpawnOptions> {
    let mut options = profile.to_options();

    if let Some(timeout) = args.timeout {
        options = options.timeout(timeout);
    }
    if let Some(retries) = args.retries {
        options = options.retries(retries);
    }
    if let Some(delay) = args.retry_delay {
        options = options.retry_delay(delay);
    }
    if let Some(encoding) = args.encoding {
        options = options.encoding(encoding);
    }
    if args.split {
        options = options.split(true);
    }
    if args.echo {
        options = options.echo_output(true);
    }
    if args.detached {
        options = options.detached();
    }
    if args.stdin {
        // Buffered once so every retry attempt gets the same input.
        let mut input = Vec::new();
        std::io::stdin().read_to_end(&mut input)?;
        options = options.stdin(InputSource::from_chunks([input]));
    }

    Ok(options)
}

fn print_output(output: &Output) -> std::io::Result<()> {
    match output {
        Output::Merged(text) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()
        }
        Output::Split(split) => {
            std::io::stdout().lock().write_all(split.stdout.as_bytes())?;
            std::io::stderr().lock().write_all(split.stderr.as_bytes())?;
            std::io::stdout().flush()
        }
    }
}

/// Exit code to mirror for a failed run.
fn exit_status_for(err: &ProcessError) -> i32 {
    match err.exit_code {
        Some(code) if (1..=255).contains(&code) => code,
        _ => 1,
    }
}
