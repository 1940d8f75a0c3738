// src/resolve/mod.rs

//! Executable resolution.
//!
//! Maps a requested executable + arguments to the command the OS launch
//! primitive can actually run:
//!
//! - bare names are searched in the current directory, then each PATH entry
//!   (on every platform, so results do not depend on the launcher);
//! - on Windows, a missing name is retried with `.exe`, `.bat`, `.cmd` and
//!   `.ps1` appended, and scripts are dispatched to their interpreter.
//!
//! Resolution never fails: when nothing matches, the input is passed through
//! unchanged and the launcher gets to report the error.

pub mod env;

use std::fmt;
use std::path::Path;

use tracing::trace;

use crate::fs::{FileSystem, RealFileSystem};

pub use env::{Platform, ResolveEnv};

/// Extensions tried, in order, for a Windows executable that does not exist
/// as given.
pub const WINDOWS_EXTENSIONS: [&str; 4] = [".exe", ".bat", ".cmd", ".ps1"];

const POWERSHELL_FLAGS: [&str; 5] = [
    "-ExecutionPolicy",
    "Unrestricted",
    "-NoLogo",
    "-NonInteractive",
    "-File",
];

/// A concrete command: `cmd` is launchable, `args` excludes the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub cmd: String,
    pub args: Vec<String>,
}

impl ResolvedCommand {
    pub fn new(cmd: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            cmd: cmd.into(),
            args,
        }
    }
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cmd)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Resolver bound to a filesystem and an environment snapshot.
///
/// Holds no state of its own: resolving the same input twice against the
/// same filesystem yields the same command.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    fs: &'a dyn FileSystem,
    env: &'a ResolveEnv,
}

impl<'a> Resolver<'a> {
    pub fn new(fs: &'a dyn FileSystem, env: &'a ResolveEnv) -> Self {
        Self { fs, env }
    }

    pub fn resolve(&self, exe: &str, args: &[String]) -> ResolvedCommand {
        let resolved = match self.env.platform {
            Platform::Posix => ResolvedCommand::new(self.search_path(exe), args.to_vec()),
            Platform::Windows => {
                let found = self.find_with_extension(exe);
                let exe = found.unwrap_or_else(|| self.search_path(exe));
                self.dispatch(exe, args)
            }
        };
        trace!(exe, cmd = %resolved.cmd, "resolved executable");
        resolved
    }

    /// Try each known extension when `exe` does not exist as given.
    ///
    /// The first hit goes straight to dispatch; it already carries a known
    /// extension so no second search can be triggered.
    fn find_with_extension(&self, exe: &str) -> Option<String> {
        if self.exists_as_given(exe) {
            return None;
        }
        WINDOWS_EXTENSIONS.iter().find_map(|ext| {
            let candidate = self.search_path(&format!("{exe}{ext}"));
            self.exists_as_given(&candidate).then_some(candidate)
        })
    }

    /// Current directory first, then each PATH entry. Anything containing a
    /// path separator is taken as already qualified.
    fn search_path(&self, exe: &str) -> String {
        if exe.contains(['/', '\\']) {
            return exe.to_string();
        }

        let local = self.env.join(&self.env.cwd, exe);
        if self.fs.is_file(Path::new(&local)) {
            return local;
        }

        self.env
            .path
            .iter()
            .map(|dir| self.env.join(dir, exe))
            .find(|candidate| self.fs.is_file(Path::new(candidate)))
            .unwrap_or_else(|| exe.to_string())
    }

    fn exists_as_given(&self, exe: &str) -> bool {
        let path = Path::new(exe);
        if self.fs.exists(path) {
            return true;
        }
        !exe.contains(['/', '\\']) && self.fs.exists(Path::new(&self.env.join(&self.env.cwd, exe)))
    }

    fn dispatch(&self, exe: String, args: &[String]) -> ResolvedCommand {
        let prefixed = |cmd: String, flags: &[&str]| {
            let mut full: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
            full.push(exe.clone());
            full.extend(args.iter().cloned());
            ResolvedCommand::new(cmd, full)
        };

        match extension(&exe).as_deref() {
            Some("ps1") => prefixed(self.env.powershell_exe(), &POWERSHELL_FLAGS),
            Some("bat") | Some("cmd") => prefixed(self.env.cmd_exe(), &["/C"]),
            Some("js") => prefixed(self.env.script_runtime.clone(), &[]),
            _ => ResolvedCommand::new(exe.clone(), args.to_vec()),
        }
    }
}

/// Lowercased extension of the last path component, if any.
fn extension(exe: &str) -> Option<String> {
    let name = exe.rsplit(['/', '\\']).next().unwrap_or(exe);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Resolve against the real filesystem and the current process environment.
pub fn resolve(exe: &str, args: &[String]) -> ResolvedCommand {
    let env = ResolveEnv::from_process();
    Resolver::new(&RealFileSystem, &env).resolve(exe, args)
}
