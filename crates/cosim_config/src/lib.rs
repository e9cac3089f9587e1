//! Parsing and validation of `cosim.toml` run configuration files.
//!
//! This crate reads the optional configuration file and produces a
//! strongly-typed [`CosimConfig`], then resolves it into the concrete
//! [`SimSettings`] the simulation driver consumes.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{discover_config, load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_settings, SimSettings};
pub use types::*;
