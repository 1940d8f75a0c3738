// src/exec/launcher.rs

//! Pluggable native launch primitive.
//!
//! The driver talks to a [`Launcher`] instead of `tokio::process` directly,
//! so tests can wrap the real launcher and observe launches and signals.
//! [`TokioLauncher`] is the production implementation.

use std::fmt::Debug;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::ExitStatus;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::exec::request::NativeOptions;
use crate::resolve::ResolvedCommand;

pub type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;
pub type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;
pub type WaitFuture<'a> = Pin<Box<dyn Future<Output = io::Result<i32>> + Send + 'a>>;

/// A live child process, exclusively owned by one activation.
pub trait ProcessHandle: Send {
    fn id(&self) -> Option<u32>;

    fn take_stdout(&mut self) -> Option<BoxedReader>;
    fn take_stderr(&mut self) -> Option<BoxedReader>;
    fn take_stdin(&mut self) -> Option<BoxedWriter>;

    /// Resolve with the exit code once the process exits.
    ///
    /// Must be cancel safe: the driver drops and recreates this future
    /// while it multiplexes other events.
    fn wait(&mut self) -> WaitFuture<'_>;

    /// Ask the process (or its group, when launched detached) to stop.
    fn terminate(&mut self) -> io::Result<()>;

    /// Forcibly kill the process (and its group, when launched detached).
    fn kill(&mut self) -> io::Result<()>;
}

/// Trait abstracting how a resolved command becomes a running process.
pub trait Launcher: Send + Sync + Debug {
    fn launch(
        &self,
        command: &ResolvedCommand,
        options: &NativeOptions,
    ) -> io::Result<Box<dyn ProcessHandle>>;
}

/// Launcher backed by `tokio::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

impl Launcher for TokioLauncher {
    fn launch(
        &self,
        command: &ResolvedCommand,
        options: &NativeOptions,
    ) -> io::Result<Box<dyn ProcessHandle>> {
        let mut cmd = Command::new(&command.cmd);
        cmd.args(&command.args);

        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        if options.env_clear {
            cmd.env_clear();
        }
        cmd.envs(&options.env);

        cmd.stdin(options.stdio.stdin.to_stdio())
            .stdout(options.stdio.stdout.to_stdio())
            .stderr(options.stdio.stderr.to_stdio())
            .kill_on_drop(true);

        if options.detached {
            #[cfg(unix)]
            cmd.process_group(0);

            #[cfg(windows)]
            {
                const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
                cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
            }
        }

        let child = cmd.spawn()?;
        let pid = child.id();
        debug!(cmd = %command.cmd, ?pid, detached = options.detached, "spawned child process");

        Ok(Box::new(TokioProcess {
            child,
            pid,
            group: options.detached,
        }))
    }
}

struct TokioProcess {
    child: Child,
    pid: Option<u32>,
    group: bool,
}

impl ProcessHandle for TokioProcess {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    fn take_stdout(&mut self) -> Option<BoxedReader> {
        self.child
            .stdout
            .take()
            .map(|s| Box::pin(s) as BoxedReader)
    }

    fn take_stderr(&mut self) -> Option<BoxedReader> {
        self.child
            .stderr
            .take()
            .map(|s| Box::pin(s) as BoxedReader)
    }

    fn take_stdin(&mut self) -> Option<BoxedWriter> {
        self.child.stdin.take().map(|s| Box::pin(s) as BoxedWriter)
    }

    fn wait(&mut self) -> WaitFuture<'_> {
        Box::pin(async move {
            let status = self.child.wait().await?;
            Ok(exit_code(status))
        })
    }

    fn terminate(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, kill, killpg};
            use nix::unistd::Pid;

            let Some(pid) = self.pid else {
                return Ok(());
            };
            let pid = Pid::from_raw(pid as i32);
            let sent = if self.group {
                killpg(pid, Signal::SIGTERM)
            } else {
                kill(pid, Signal::SIGTERM)
            };
            match sent {
                Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
                Err(errno) => Err(io::Error::from(errno)),
            }
        }

        #[cfg(not(unix))]
        {
            self.child.start_kill()
        }
    }

    fn kill(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        if self.group {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            if let Some(pid) = self.pid {
                match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                    Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
                    Err(errno) => return Err(io::Error::from(errno)),
                }
            }
        }

        match self.child.start_kill() {
            // Already reaped.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }
}

/// Exit code, or `128 + signal` for a signal death on Unix.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}
