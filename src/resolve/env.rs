// src/resolve/env.rs

//! Platform facts consulted during resolution.
//!
//! Kept as plain data so tests can resolve "as Windows" on any host.

/// Launch-semantics family of the target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// No PATH search in the launch primitive, scripts need an interpreter.
    Windows,
    Posix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    pub fn separator(self) -> char {
        match self {
            Platform::Windows => '\\',
            Platform::Posix => '/',
        }
    }
}

/// Environment snapshot used by [`super::Resolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveEnv {
    pub platform: Platform,
    /// Directory probed before any PATH entry.
    pub cwd: String,
    /// PATH entries, in search order.
    pub path: Vec<String>,
    /// `%SYSTEMROOT%`, home of `cmd.exe` and PowerShell.
    pub system_root: String,
    /// Interpreter for `.js` scripts.
    pub script_runtime: String,
}

pub const DEFAULT_SYSTEM_ROOT: &str = "C:\\Windows";
pub const DEFAULT_SCRIPT_RUNTIME: &str = "node";
/// Overrides the `.js` interpreter.
pub const SCRIPT_RUNTIME_ENV: &str = "PROCSTREAM_JS_RUNTIME";

impl ResolveEnv {
    /// Snapshot the current process environment.
    pub fn from_process() -> Self {
        let cwd = std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| ".".to_string());

        let path = std::env::var_os("PATH")
            .map(|raw| {
                std::env::split_paths(&raw)
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            platform: Platform::current(),
            cwd,
            path,
            system_root: std::env::var("SYSTEMROOT")
                .unwrap_or_else(|_| DEFAULT_SYSTEM_ROOT.to_string()),
            script_runtime: std::env::var(SCRIPT_RUNTIME_ENV)
                .unwrap_or_else(|_| DEFAULT_SCRIPT_RUNTIME.to_string()),
        }
    }

    /// A fixed environment for the given platform with the given PATH.
    pub fn new(platform: Platform, cwd: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            platform,
            cwd: cwd.into(),
            path,
            system_root: DEFAULT_SYSTEM_ROOT.to_string(),
            script_runtime: DEFAULT_SCRIPT_RUNTIME.to_string(),
        }
    }

    /// Join with the platform's separator, independent of the host.
    pub fn join(&self, dir: &str, name: &str) -> String {
        let sep = self.platform.separator();
        if dir.ends_with(['/', '\\']) {
            format!("{dir}{name}")
        } else {
            format!("{dir}{sep}{name}")
        }
    }

    pub fn cmd_exe(&self) -> String {
        self.join(&self.join(&self.system_root, "System32"), "cmd.exe")
    }

    pub fn powershell_exe(&self) -> String {
        let dir = ["System32", "WindowsPowerShell", "v1.0"]
            .iter()
            .fold(self.system_root.clone(), |acc, part| self.join(&acc, part));
        self.join(&dir, "PowerShell.exe")
    }
}
