// src/exec/executor.rs

use std::sync::Arc;

use crate::errors::ProcessError;
use crate::exec::aggregate::{self, Output, SplitOutput};
use crate::exec::jobber;
use crate::exec::launcher::{Launcher, TokioLauncher};
use crate::exec::policy::{self, EventStream};
use crate::exec::request::SpawnRequest;
use crate::exec::stream::ProcessStream;
use crate::fs::{FileSystem, RealFileSystem};
use crate::resolve::{ResolveEnv, ResolvedCommand, Resolver};

/// Entry point for running processes.
///
/// Bundles the collaborators every activation needs: the launcher, the
/// filesystem used for resolution, the environment snapshot and the jobber
/// helper binary. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Executor {
    launcher: Arc<dyn Launcher>,
    fs: Arc<dyn FileSystem>,
    env: Arc<ResolveEnv>,
    jobber: Arc<str>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(
            Arc::new(TokioLauncher),
            Arc::new(RealFileSystem),
            ResolveEnv::from_process(),
        )
    }
}

impl Executor {
    pub fn new(launcher: Arc<dyn Launcher>, fs: Arc<dyn FileSystem>, env: ResolveEnv) -> Self {
        Self {
            launcher,
            fs,
            env: Arc::new(env),
            jobber: Arc::from(jobber::jobber_binary()),
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_resolver(mut self, fs: Arc<dyn FileSystem>, env: ResolveEnv) -> Self {
        self.fs = fs;
        self.env = Arc::new(env);
        self
    }

    /// Helper binary used for `jobber` requests, instead of the one named
    /// by `PROCSTREAM_JOBBER`.
    pub fn with_jobber_binary(mut self, binary: impl Into<String>) -> Self {
        self.jobber = Arc::from(binary.into());
        self
    }

    pub fn launcher(&self) -> &dyn Launcher {
        self.launcher.as_ref()
    }

    pub fn resolve(&self, exe: &str, args: &[String]) -> ResolvedCommand {
        Resolver::new(self.fs.as_ref(), &self.env).resolve(exe, args)
    }

    /// The command one activation of `request` will launch. With `jobber`
    /// set, the real command becomes the helper's arguments.
    pub fn resolve_request(&self, request: &SpawnRequest) -> ResolvedCommand {
        let real = self.resolve(&request.executable, &request.args);
        if !request.options.jobber {
            return real;
        }
        self.resolve(&self.jobber, &jobber::wrap_args(&real))
    }

    /// Multicast stream for a single attempt. Retries are not applied; the
    /// deadline is.
    pub fn process_stream(&self, request: SpawnRequest) -> ProcessStream {
        ProcessStream::new(self.clone(), Arc::new(request), 1)
    }

    /// Event stream with the request's timeout and retry policy applied.
    pub fn spawn(&self, request: SpawnRequest) -> EventStream {
        policy::with_retry(self.clone(), Arc::new(request))
    }

    pub fn spawn_detached(&self, mut request: SpawnRequest) -> EventStream {
        request.options = request.options.detached();
        self.spawn(request)
    }

    pub async fn run(&self, request: SpawnRequest) -> Result<String, ProcessError> {
        aggregate::collect_merged(self.spawn(request)).await
    }

    pub async fn run_split(&self, request: SpawnRequest) -> Result<SplitOutput, ProcessError> {
        aggregate::collect_split(self.spawn(request)).await
    }

    /// Merged or split, as chosen by `options.split`.
    pub async fn run_output(&self, request: SpawnRequest) -> Result<Output, ProcessError> {
        let split = request.options.split;
        aggregate::collect(self.spawn(request), split).await
    }

    pub async fn run_detached(&self, request: SpawnRequest) -> Result<String, ProcessError> {
        aggregate::collect_merged(self.spawn_detached(request)).await
    }

    pub async fn run_detached_split(
        &self,
        request: SpawnRequest,
    ) -> Result<SplitOutput, ProcessError> {
        aggregate::collect_split(self.spawn_detached(request)).await
    }
}
