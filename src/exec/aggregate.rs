// src/exec/aggregate.rs

//! Collapse an event stream into one value.
//!
//! When a stream carries several retry attempts, only the attempt that
//! produced the final outcome contributes output.

use std::pin::pin;

use futures::{Stream, StreamExt};

use crate::errors::ProcessError;
use crate::exec::stream::{EventItem, OutputEvent};
use crate::types::OutputSource;

/// Stdout and stderr collected independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Result shape chosen at runtime (see `SpawnOptions::split`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Merged(String),
    Split(SplitOutput),
}

struct Accumulator {
    split: bool,
    attempt: u32,
    stdout: String,
    stderr: String,
}

impl Accumulator {
    fn new(split: bool) -> Self {
        Self {
            split,
            attempt: 1,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    fn align(&mut self, attempt: u32) {
        if attempt != self.attempt {
            self.stdout.clear();
            self.stderr.clear();
            self.attempt = attempt;
        }
    }

    fn push(&mut self, event: OutputEvent) {
        self.align(event.attempt);
        match (self.split, event.source) {
            (true, OutputSource::Stderr) => self.stderr.push_str(&event.text),
            _ => self.stdout.push_str(&event.text),
        }
    }
}

async fn drain<S>(stream: S, split: bool) -> (Accumulator, Option<ProcessError>)
where
    S: Stream<Item = EventItem>,
{
    let mut stream = pin!(stream);
    let mut acc = Accumulator::new(split);
    while let Some(item) = stream.next().await {
        match item {
            Ok(event) => acc.push(event),
            Err(err) => {
                acc.align(err.attempt);
                return (acc, Some(err));
            }
        }
    }
    (acc, None)
}

/// All output, in arrival order, as one string.
///
/// On failure the error message is prefixed with the collected output,
/// which is also attached as `stdout`.
pub async fn collect_merged<S>(stream: S) -> Result<String, ProcessError>
where
    S: Stream<Item = EventItem>,
{
    match drain(stream, false).await {
        (acc, None) => Ok(acc.stdout),
        (acc, Some(err)) => Err(err.with_merged_output(acc.stdout)),
    }
}

/// Stdout and stderr kept apart. On failure both partial buffers are
/// attached to the error.
pub async fn collect_split<S>(stream: S) -> Result<SplitOutput, ProcessError>
where
    S: Stream<Item = EventItem>,
{
    match drain(stream, true).await {
        (acc, None) => Ok(SplitOutput {
            stdout: acc.stdout,
            stderr: acc.stderr,
        }),
        (acc, Some(err)) => Err(err.with_split_output(acc.stdout, acc.stderr)),
    }
}

pub async fn collect<S>(stream: S, split: bool) -> Result<Output, ProcessError>
where
    S: Stream<Item = EventItem>,
{
    if split {
        collect_split(stream).await.map(Output::Split)
    } else {
        collect_merged(stream).await.map(Output::Merged)
    }
}
