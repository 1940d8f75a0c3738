// src/errors.rs

//! Crate-wide error types.
//!
//! [`ProcessError`] is the terminal error of a process event stream. It keeps
//! enough context (command, args, exit code, partial output) to reconstruct
//! what failed. [`ProcstreamError`] is the wider error used by the config
//! loader and the CLI.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::resolve::ResolvedCommand;

/// Exit code reported on a [`ErrorKind::Timeout`] failure.
///
/// Matches the convention of coreutils `timeout(1)`. The `kind` field is the
/// authoritative classification; the code only exists so callers that only
/// look at exit codes still see something distinct from a clean exit.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Classification of a terminal process failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The process could not be started at all.
    Launch,
    /// The process exited with a nonzero code. The only retryable kind.
    Exit,
    /// The process outlived its deadline and was force-killed.
    Timeout,
    /// An input source was configured but the child has no writable stdin.
    StdinConflict,
    /// The configured input source itself failed.
    Input,
    /// Waiting on the child failed.
    Io,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProcessError {
    pub kind: ErrorKind,
    pub message: String,
    pub exit_code: Option<i32>,
    pub command: String,
    pub args: Vec<String>,
    /// Launch attempt (1-based) that produced this failure.
    pub attempt: u32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl ProcessError {
    fn new(kind: ErrorKind, command: &ResolvedCommand, message: String) -> Self {
        Self {
            kind,
            message,
            exit_code: None,
            command: command.cmd.clone(),
            args: command.args.clone(),
            attempt: 1,
            stdout: None,
            stderr: None,
        }
    }

    pub fn launch(command: &ResolvedCommand, err: &io::Error) -> Self {
        Self::new(
            ErrorKind::Launch,
            command,
            format!("failed to launch {}: {}", command.cmd, err),
        )
    }

    pub fn exit(command: &ResolvedCommand, code: i32) -> Self {
        let mut err = Self::new(
            ErrorKind::Exit,
            command,
            format!("{} failed with exit code: {}", command.cmd, code),
        );
        err.exit_code = Some(code);
        err
    }

    pub fn timeout(command: &ResolvedCommand, after: Duration) -> Self {
        let mut err = Self::new(
            ErrorKind::Timeout,
            command,
            format!("{} timed out after {:?}", command.cmd, after),
        );
        err.exit_code = Some(TIMEOUT_EXIT_CODE);
        err
    }

    pub fn stdin_conflict(command: &ResolvedCommand) -> Self {
        Self::new(
            ErrorKind::StdinConflict,
            command,
            format!(
                "input was requested for {} but its stdin is not piped",
                command.cmd
            ),
        )
    }

    pub fn input(command: &ResolvedCommand, err: &io::Error) -> Self {
        Self::new(
            ErrorKind::Input,
            command,
            format!("input source for {} failed: {}", command.cmd, err),
        )
    }

    pub fn io(command: &ResolvedCommand, context: &str, err: &io::Error) -> Self {
        Self::new(
            ErrorKind::Io,
            command,
            format!("{} {}: {}", context, command.cmd, err),
        )
    }

    pub(crate) fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    /// Only a nonzero exit is worth launching again.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Exit
    }

    /// Attach merged output: the message becomes the output immediately
    /// followed by the original message, and the output is kept as `stdout`.
    pub fn with_merged_output(mut self, output: String) -> Self {
        self.message = format!("{}{}", output, self.message);
        self.stdout = Some(output);
        self
    }

    pub fn with_split_output(mut self, stdout: String, stderr: String) -> Self {
        self.stdout = Some(stdout);
        self.stderr = Some(stderr);
        self
    }
}

#[derive(Error, Debug)]
pub enum ProcstreamError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ProcstreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd() -> ResolvedCommand {
        ResolvedCommand::new("/bin/false", vec!["-x".to_string()])
    }

    #[test]
    fn exit_error_carries_code_and_command() {
        let err = ProcessError::exit(&cmd(), 3);
        assert_eq!(err.kind, ErrorKind::Exit);
        assert_eq!(err.exit_code, Some(3));
        assert_eq!(err.command, "/bin/false");
        assert_eq!(err.args, vec!["-x".to_string()]);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("exit code: 3"));
    }

    #[test]
    fn only_exit_failures_are_retryable() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        assert!(!ProcessError::launch(&cmd(), &io_err).is_retryable());
        assert!(!ProcessError::stdin_conflict(&cmd()).is_retryable());
        assert!(!ProcessError::input(&cmd(), &io_err).is_retryable());
        let timeout = ProcessError::timeout(&cmd(), Duration::from_millis(50));
        assert!(!timeout.is_retryable());
        assert_eq!(timeout.exit_code, Some(TIMEOUT_EXIT_CODE));
    }

    #[test]
    fn merged_output_prefixes_message() {
        let err = ProcessError::exit(&cmd(), 1);
        let message = err.message.clone();
        let err = err.with_merged_output("partial".to_string());
        assert_eq!(err.message, format!("partial{message}"));
        assert_eq!(err.stdout.as_deref(), Some("partial"));
        assert_eq!(err.stderr, None);
    }

    #[test]
    fn empty_merged_output_keeps_message() {
        let err = ProcessError::exit(&cmd(), 1);
        let message = err.message.clone();
        let err = err.with_merged_output(String::new());
        assert_eq!(err.message, message);
        assert_eq!(err.stdout.as_deref(), Some(""));
    }
}
