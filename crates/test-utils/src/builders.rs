#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use procstream::exec::{Executor, SpawnOptions, SpawnRequest};

use crate::CountingLauncher;

/// `sh -c <script>` with default options.
pub fn sh(script: &str) -> SpawnRequest {
    SpawnRequest::new("sh", ["-c", script])
}

/// `sh -c <script>` with the given options.
pub fn sh_with(script: &str, options: SpawnOptions) -> SpawnRequest {
    sh(script).with_options(options)
}

/// An executor whose launches are observed by the returned launcher.
pub fn counting_executor() -> (Executor, CountingLauncher) {
    let launcher = CountingLauncher::new();
    let executor = Executor::default().with_launcher(Arc::new(launcher.clone()));
    (executor, launcher)
}

/// Options for fast retry tests.
pub fn quick_retries(retries: u32) -> SpawnOptions {
    SpawnOptions::new()
        .retries(retries)
        .retry_delay(Duration::from_millis(10))
}
