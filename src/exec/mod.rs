// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`request`] describes what to run ([`SpawnRequest`], [`SpawnOptions`]).
//! - [`launcher`] is the native launch primitive behind a trait, with the
//!   `tokio::process` implementation [`TokioLauncher`].
//! - [`stream`] is the multicast [`ProcessStream`] around one activation;
//!   its driver task lives in `driver`.
//! - [`policy`] layers the retry policy over activations.
//! - [`aggregate`] collapses event streams into merged or split output.
//! - [`jobber`] is the wire contract with the external group-kill helper.
//! - [`executor`] ties it together behind [`Executor`].

pub mod aggregate;
pub mod decode;
mod driver;
pub mod executor;
pub mod jobber;
pub mod launcher;
pub mod policy;
pub mod request;
pub mod stream;

pub use aggregate::{Output, SplitOutput, collect, collect_merged, collect_split};
pub use executor::Executor;
pub use launcher::{Launcher, ProcessHandle, TokioLauncher};
pub use policy::EventStream;
pub use request::{InputSource, NativeOptions, SpawnOptions, SpawnRequest};
pub use stream::{EventItem, OutputEvent, ProcessStream, Subscription};
