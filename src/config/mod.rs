// src/config/mod.rs

//! Optional TOML profile supplying default spawn options for the CLI.
//!
//! - [`model`] holds the raw (serde) and validated shapes.
//! - [`validate`] turns one into the other and parses durations.
//! - [`loader`] reads files.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{Profile, RawDefaults, RawProfile};
pub use validate::parse_duration;
