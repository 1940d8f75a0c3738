use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use procstream::exec::launcher::{BoxedReader, BoxedWriter, WaitFuture};
use procstream::exec::{Launcher, NativeOptions, ProcessHandle, TokioLauncher};
use procstream::resolve::ResolvedCommand;

/// A launcher that:
/// - records every command it was asked to launch, and the pids it got
/// - counts termination requests and forced kills on the handles it hands out
/// - delegates the real work to `TokioLauncher`.
#[derive(Debug, Clone, Default)]
pub struct CountingLauncher {
    inner: TokioLauncher,
    launched: Arc<std::sync::Mutex<Vec<ResolvedCommand>>>,
    pids: Arc<std::sync::Mutex<Vec<u32>>>,
    terminations: Arc<AtomicUsize>,
    kills: Arc<AtomicUsize>,
}

impl CountingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launches(&self) -> usize {
        self.launched.lock().unwrap().len()
    }

    pub fn launched(&self) -> Vec<ResolvedCommand> {
        self.launched.lock().unwrap().clone()
    }

    pub fn pids(&self) -> Vec<u32> {
        self.pids.lock().unwrap().clone()
    }

    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

impl Launcher for CountingLauncher {
    fn launch(
        &self,
        command: &ResolvedCommand,
        options: &NativeOptions,
    ) -> io::Result<Box<dyn ProcessHandle>> {
        self.launched.lock().unwrap().push(command.clone());
        let inner = self.inner.launch(command, options)?;
        if let Some(pid) = inner.id() {
            self.pids.lock().unwrap().push(pid);
        }
        Ok(Box::new(CountingHandle {
            inner,
            terminations: Arc::clone(&self.terminations),
            kills: Arc::clone(&self.kills),
        }))
    }
}

struct CountingHandle {
    inner: Box<dyn ProcessHandle>,
    terminations: Arc<AtomicUsize>,
    kills: Arc<AtomicUsize>,
}

impl ProcessHandle for CountingHandle {
    fn id(&self) -> Option<u32> {
        self.inner.id()
    }

    fn take_stdout(&mut self) -> Option<BoxedReader> {
        self.inner.take_stdout()
    }

    fn take_stderr(&mut self) -> Option<BoxedReader> {
        self.inner.take_stderr()
    }

    fn take_stdin(&mut self) -> Option<BoxedWriter> {
        self.inner.take_stdin()
    }

    fn wait(&mut self) -> WaitFuture<'_> {
        self.inner.wait()
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        self.inner.terminate()
    }

    fn kill(&mut self) -> io::Result<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.inner.kill()
    }
}
