// src/exec/request.rs

//! What to run and how: [`SpawnRequest`] and its [`SpawnOptions`].

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::exec::jobber::TERMINATION_GRACE;
use crate::types::{Encoding, StdioConfig};

/// Delay between retry attempts when `retries` is set without a delay.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Chunks fed into a child's stdin.
pub type InputChunks = BoxStream<'static, io::Result<Vec<u8>>>;

/// Factory for a child's stdin feed.
///
/// Every launch (including retries) opens a fresh feed, so a request can be
/// re-run without sharing a half-consumed stream.
#[derive(Clone)]
pub struct InputSource(Arc<dyn Fn() -> InputChunks + Send + Sync>);

impl InputSource {
    pub fn new<F, S>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = io::Result<Vec<u8>>> + Send + 'static,
    {
        Self(Arc::new(move || factory().boxed()))
    }

    pub fn from_chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        let chunks: Vec<Vec<u8>> = chunks.into_iter().map(Into::into).collect();
        Self::new(move || stream::iter(chunks.clone().into_iter().map(Ok)))
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self::from_chunks([text.into().into_bytes()])
    }

    pub(crate) fn open(&self) -> InputChunks {
        (self.0)()
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InputSource(..)")
    }
}

/// Options handed to the native launcher. Everything engine-specific has
/// already been stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeOptions {
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub env_clear: bool,
    pub stdio: StdioConfig,
    /// Launch in a new process group (Unix) / detached process group
    /// (Windows), so termination can reach the whole tree.
    pub detached: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    pub cwd: Option<PathBuf>,
    /// Added on top of the inherited environment (or a cleared one).
    pub env: BTreeMap<String, String>,
    pub env_clear: bool,
    pub stdio: StdioConfig,
    pub detached: bool,

    /// Fed into the child's stdin, which is closed when the feed ends.
    /// Without one, the child's stdin pipe is closed right after launch.
    pub stdin: Option<InputSource>,
    /// Tee every chunk to this process's stdout / stderr.
    pub echo_output: bool,
    /// Prefer split aggregation in [`crate::exec::Executor::run_output`].
    pub split: bool,
    /// Wrap the command in the jobber helper and terminate through it.
    pub jobber: bool,
    pub encoding: Encoding,
    /// Force-kill after this long. Zero means no deadline.
    pub timeout: Option<Duration>,
    /// Extra launches allowed after a nonzero exit.
    pub retries: u32,
    pub retry_delay: Option<Duration>,
    /// How long a cancelled process gets to exit after the termination
    /// request before it is force-killed. Defaults to [`TERMINATION_GRACE`].
    pub termination_grace: Option<Duration>,
    /// Parent for the per-activation tracing span.
    pub span: Option<tracing::Span>,
}

impl SpawnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn stdio(mut self, stdio: StdioConfig) -> Self {
        self.stdio = stdio;
        self
    }

    pub fn stdin(mut self, source: InputSource) -> Self {
        self.stdin = Some(source);
        self
    }

    pub fn echo_output(mut self, echo: bool) -> Self {
        self.echo_output = echo;
        self
    }

    pub fn split(mut self, split: bool) -> Self {
        self.split = split;
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = Some(grace);
        self
    }

    pub fn span(mut self, span: tracing::Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Launch in a process group the driver can terminate as a unit.
    ///
    /// Unix has native group signalling; elsewhere the jobber helper is used.
    pub fn detached(mut self) -> Self {
        self.detached = true;
        self.jobber = !cfg!(unix);
        self
    }

    pub fn native(&self) -> NativeOptions {
        NativeOptions {
            cwd: self.cwd.clone(),
            env: self.env.clone(),
            env_clear: self.env_clear,
            stdio: self.stdio,
            detached: self.detached,
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.timeout.filter(|t| !t.is_zero())
    }

    pub fn effective_retry_delay(&self) -> Duration {
        self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY)
    }

    pub fn effective_termination_grace(&self) -> Duration {
        self.termination_grace.unwrap_or(TERMINATION_GRACE)
    }
}

/// An executable, its arguments and options. Plain data: resolution and
/// launch happen per activation.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub executable: String,
    pub args: Vec<String>,
    pub options: SpawnOptions,
}

impl SpawnRequest {
    pub fn new<I, S>(executable: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            executable: executable.into(),
            args: args.into_iter().map(Into::into).collect(),
            options: SpawnOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SpawnOptions) -> Self {
        self.options = options;
        self
    }
}
