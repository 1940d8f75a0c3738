// src/exec/jobber.rs

//! Contract with the external "jobber" helper.
//!
//! The helper is launched as `[jobber, real_exe, ...real_args]`, proxies the
//! real process's stdio, and owns the process tree (a job object on
//! Windows). Connecting to its named channel asks it to tear the tree down.
//! Only the wire contract lives here.

use std::io;
use std::time::Duration;

use crate::resolve::ResolvedCommand;

/// Environment variable naming the helper binary.
pub const JOBBER_ENV: &str = "PROCSTREAM_JOBBER";
pub const DEFAULT_JOBBER: &str = "jobber";

/// How long a termination request gets before the driver force-kills.
pub const TERMINATION_GRACE: Duration = Duration::from_secs(5);

pub fn jobber_binary() -> String {
    std::env::var(JOBBER_ENV).unwrap_or_else(|_| DEFAULT_JOBBER.to_string())
}

/// Arguments for launching `real` under the helper.
pub fn wrap_args(real: &ResolvedCommand) -> Vec<String> {
    std::iter::once(real.cmd.clone())
        .chain(real.args.iter().cloned())
        .collect()
}

/// Name of the shutdown channel the helper listens on for `pid`.
pub fn channel_name(pid: u32) -> String {
    if cfg!(windows) {
        format!(r"\\.\pipe\jobber-{pid}")
    } else {
        std::env::temp_dir()
            .join(format!("jobber-{pid}.sock"))
            .to_string_lossy()
            .into_owned()
    }
}

/// Connect to the helper's channel. The connection itself is the request;
/// nothing is written and no reply is awaited.
pub async fn request_shutdown(pid: u32) -> io::Result<()> {
    let name = channel_name(pid);

    #[cfg(windows)]
    {
        let _pipe = tokio::net::windows::named_pipe::ClientOptions::new().open(&name)?;
        Ok(())
    }

    #[cfg(unix)]
    {
        let _stream = tokio::net::UnixStream::connect(&name).await?;
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("no jobber channel support for {name}"),
        ))
    }
}
