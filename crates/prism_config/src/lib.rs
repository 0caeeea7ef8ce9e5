//! Parsing and validation of `prism.toml` cache configuration files.
//!
//! This crate reads the cache configuration and produces a strongly-typed
//! [`CacheConfig`] describing the in-process and persistent cache tiers.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use types::*;
