//! Module configuration
//!
//! Types with embedded defaults, a small TOML parser and a loader that
//! reads the config file from the module's store.

pub mod loader;
pub mod toml;
pub mod types;

pub use loader::{load_config, ConfigError, CONFIG_PATH};
pub use toml::{parse_config, ConfigKey, ParseError};
pub use types::*;
