// src/exec/driver.rs

//! Per-activation driver task.
//!
//! Owns the child process for its whole life and reacts to:
//! - output chunks and pipe closures (from reader tasks),
//! - input source failures (from the stdin feeder),
//! - process exit,
//! - the deadline timer,
//! - cancellation (last subscriber detached).
//!
//! The stream only completes once the exit has been observed **and** every
//! output pipe has closed, so trailing output written just before exit is
//! never lost.
//!
//! Reader and feeder tasks live in a `JoinSet` owned by the driver, so they
//! are aborted (releasing the input source and the pipes) on every way out
//! of [`drive`].

use std::io;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time;
use tracing::{Instrument, debug, info, warn};

use crate::errors::ProcessError;
use crate::exec::decode::decode_chunk;
use crate::exec::jobber;
use crate::exec::launcher::{BoxedReader, BoxedWriter, ProcessHandle};
use crate::exec::policy;
use crate::exec::request::InputChunks;
use crate::exec::stream::Sink;
use crate::types::OutputSource;

const READ_CHUNK: usize = 8 * 1024;

enum PipeMsg {
    Chunk(OutputSource, Vec<u8>),
    Closed(OutputSource),
    InputFailed(io::Error),
}

pub(crate) async fn drive(sink: Sink, mut cancel_rx: oneshot::Receiver<()>) {
    let request = sink.request();
    let options = &request.options;
    let resolved = sink.executor().resolve_request(request);

    if !sink.is_current() {
        debug!("activation cancelled before launch");
        return;
    }

    info!(cmd = %resolved, "launching process");
    let mut child = match sink.executor().launcher().launch(&resolved, &options.native()) {
        Ok(child) => child,
        Err(err) => {
            warn!(cmd = %resolved.cmd, error = %err, "failed to launch process");
            sink.finish(Err(ProcessError::launch(&resolved, &err)));
            return;
        }
    };
    let pid = child.id();

    let (tx, mut rx) = mpsc::unbounded_channel::<PipeMsg>();
    let mut io_tasks = JoinSet::new();
    let mut open_pipes = 0usize;
    let pipes = [
        (OutputSource::Stdout, child.take_stdout()),
        (OutputSource::Stderr, child.take_stderr()),
    ];
    for (source, reader) in pipes {
        if let Some(reader) = reader {
            open_pipes += 1;
            io_tasks.spawn(pump(reader, source, tx.clone()).in_current_span());
        }
    }

    match (&options.stdin, child.take_stdin()) {
        (Some(source), Some(writer)) => {
            io_tasks.spawn(feed(source.open(), writer, tx.clone()).in_current_span());
        }
        (Some(_), None) => {
            // The child is already running; kill it rather than leave it
            // behind with nobody listening.
            warn!(?pid, "input source configured but child stdin is not piped");
            if let Err(err) = child.kill() {
                warn!(?pid, error = %err, "failed to kill child after stdin conflict");
            }
            sink.finish(Err(ProcessError::stdin_conflict(&resolved)));
            return;
        }
        // Dropping the writer gives the child EOF right away.
        (None, _) => {}
    }
    drop(tx);

    let timer = policy::deadline_timer(options.deadline());
    tokio::pin!(timer);
    let mut exit: Option<i32> = None;

    loop {
        if let Some(code) = exit {
            if open_pipes == 0 {
                if code == 0 {
                    info!(?pid, "process completed");
                    sink.finish(Ok(()));
                } else {
                    info!(?pid, exit_code = code, "process failed");
                    sink.finish(Err(ProcessError::exit(&resolved, code)));
                }
                return;
            }
        }

        tokio::select! {
            biased;

            _ = &mut cancel_rx => {
                if exit.is_some() {
                    debug!(?pid, "process already exited; nothing to terminate");
                } else {
                    let grace = options.effective_termination_grace();
                    terminate(child.as_mut(), pid, options.jobber, grace).await;
                }
                return;
            }

            // Stays armed after exit: pipes still held open by descendants
            // keep the activation alive, and the deadline covers that too.
            _ = &mut timer => {
                let after = options.deadline().unwrap_or_default();
                if exit.is_none() || options.detached {
                    warn!(?pid, timeout = ?after, "process exceeded its deadline; killing");
                    if let Err(err) = child.kill() {
                        warn!(?pid, error = %err, "failed to kill timed-out process");
                    }
                } else {
                    warn!(
                        ?pid,
                        timeout = ?after,
                        open_pipes,
                        "output still open past the deadline after exit"
                    );
                }
                sink.finish(Err(ProcessError::timeout(&resolved, after)));
                return;
            }

            Some(msg) = rx.recv() => match msg {
                PipeMsg::Chunk(source, bytes) => {
                    if options.echo_output {
                        echo(source, &bytes).await;
                    }
                    let text = decode_chunk(options.encoding, &bytes, &resolved.cmd);
                    sink.emit(source, text);
                }
                PipeMsg::Closed(source) => {
                    open_pipes -= 1;
                    debug!(%source, open_pipes, "output pipe closed");
                }
                PipeMsg::InputFailed(err) => {
                    warn!(?pid, error = %err, "input source failed; killing process");
                    if let Err(kill_err) = child.kill() {
                        warn!(?pid, error = %kill_err, "failed to kill process");
                    }
                    sink.finish(Err(ProcessError::input(&resolved, &err)));
                    return;
                }
            },

            status = child.wait(), if exit.is_none() => match status {
                Ok(code) => {
                    debug!(?pid, exit_code = code, open_pipes, "process exited");
                    exit = Some(code);
                }
                Err(err) => {
                    warn!(?pid, error = %err, "failed waiting for process");
                    sink.finish(Err(ProcessError::io(&resolved, "waiting for", &err)));
                    return;
                }
            },
        }
    }
}

/// Ask a live process to stop, then force-kill it if it is still running
/// after `grace`.
async fn terminate(child: &mut dyn ProcessHandle, pid: Option<u32>, jobber: bool, grace: Duration) {
    info!(?pid, jobber, "terminating process after last subscriber detached");

    let requested = match (jobber, pid) {
        (true, Some(pid)) => jobber::request_shutdown(pid).await,
        (true, None) => Err(io::Error::other("process has no pid to signal jobber with")),
        (false, _) => child.terminate(),
    };

    if let Err(err) = requested {
        warn!(?pid, error = %err, "termination request failed; killing process");
        if let Err(err) = child.kill() {
            warn!(?pid, error = %err, "failed to kill process");
        }
        return;
    }

    match time::timeout(grace, child.wait()).await {
        Ok(Ok(code)) => debug!(?pid, exit_code = code, "process exited after termination"),
        Ok(Err(err)) => warn!(?pid, error = %err, "failed waiting for terminated process"),
        Err(_) => {
            warn!(?pid, ?grace, "process still running; forcing kill");
            if let Err(err) = child.kill() {
                warn!(?pid, error = %err, "failed to kill process");
            }
        }
    }
}

async fn pump(mut reader: BoxedReader, source: OutputSource, tx: mpsc::UnboundedSender<PipeMsg>) {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(PipeMsg::Chunk(source, buf[..n].to_vec())).is_err() {
                    return;
                }
            }
            Err(err) => {
                warn!(%source, error = %err, "error reading child output; treating as closed");
                break;
            }
        }
    }
    let _ = tx.send(PipeMsg::Closed(source));
}

async fn feed(mut input: InputChunks, mut writer: BoxedWriter, tx: mpsc::UnboundedSender<PipeMsg>) {
    while let Some(chunk) = input.next().await {
        match chunk {
            Ok(bytes) => {
                if let Err(err) = writer.write_all(&bytes).await {
                    debug!(error = %err, "child stdin closed early; dropping remaining input");
                    return;
                }
            }
            Err(err) => {
                let _ = tx.send(PipeMsg::InputFailed(err));
                return;
            }
        }
    }
    if let Err(err) = writer.shutdown().await {
        debug!(error = %err, "failed to close child stdin");
    }
}

async fn echo(source: OutputSource, bytes: &[u8]) {
    let written = match source {
        OutputSource::Stdout => write_flushed(tokio::io::stdout(), bytes).await,
        OutputSource::Stderr => write_flushed(tokio::io::stderr(), bytes).await,
    };
    if let Err(err) = written {
        debug!(%source, error = %err, "failed to echo output");
    }
}

async fn write_flushed<W: AsyncWrite + Unpin>(mut out: W, bytes: &[u8]) -> io::Result<()> {
    out.write_all(bytes).await?;
    out.flush().await
}
