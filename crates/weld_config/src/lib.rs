//! Parsing and validation of `weld.toml` bridge configuration files.
//!
//! The file names the generated guest module, where generated netlists go,
//! the target device, and the table of physical resources a platform can
//! hand out as pad descriptors.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use types::*;
