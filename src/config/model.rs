// src/config/model.rs

//! TOML profile model.
//!
//! ```toml
//! [defaults]
//! timeout = "30s"
//! retries = 2
//! retry_delay = "500ms"
//! encoding = "utf8-lossy"
//! echo_output = false
//! split = true
//! detached = false
//! cwd = "build"
//!
//! [env]
//! RUST_LOG = "debug"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::SpawnOptions;
use crate::types::Encoding;

/// Profile as written on disk; durations are still strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawProfile {
    #[serde(default)]
    pub defaults: RawDefaults,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDefaults {
    pub timeout: Option<String>,
    pub retries: Option<u32>,
    pub retry_delay: Option<String>,
    pub encoding: Option<Encoding>,
    pub echo_output: Option<bool>,
    pub split: Option<bool>,
    pub detached: Option<bool>,
    pub cwd: Option<PathBuf>,
}

/// Validated profile. Build via `Profile::try_from(RawProfile)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub timeout: Option<Duration>,
    pub retries: u32,
    pub retry_delay: Option<Duration>,
    pub encoding: Encoding,
    pub echo_output: bool,
    pub split: bool,
    pub detached: bool,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl Profile {
    /// Spawn options seeded from this profile.
    pub fn to_options(&self) -> SpawnOptions {
        let mut options = SpawnOptions::new()
            .encoding(self.encoding)
            .echo_output(self.echo_output)
            .split(self.split)
            .retries(self.retries);
        options.timeout = self.timeout;
        options.retry_delay = self.retry_delay;
        options.cwd = self.cwd.clone();
        options.env = self.env.clone();
        if self.detached {
            options = options.detached();
        }
        options
    }
}
